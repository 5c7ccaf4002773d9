//! JSON documents read and written by the command-line tool.
//!
//! Materials are property bags:
//!
//! ```json
//! {"id": "PhysicalMaterial", "name": "Floor",
//!  "properties": {"roughness": {"float": 0.4},
//!                 "base_color_map": {"texture": {"identity": "wood", "name": "wood",
//!                                                "file_path": "C:/maps/wood.png"}}}}
//! ```
//!
//! A file holds either one material, a list of them, or an object with a
//! `materials` list.

use matconv_core::{ConfigError, PropertyBag};
use matconv_graph::ShadingNetwork;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum MaterialDocument {
    Wrapped { materials: Vec<PropertyBag> },
    List(Vec<PropertyBag>),
    Single(PropertyBag),
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_materials(text: &str, path: &Path) -> Result<Vec<PropertyBag>, ConfigError> {
    let document: MaterialDocument =
        serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let mut materials = match document {
        MaterialDocument::Wrapped { materials } | MaterialDocument::List(materials) => materials,
        MaterialDocument::Single(material) => vec![material],
    };
    for material in &mut materials {
        if material.name.is_empty() {
            material.name = material.id.clone();
        }
    }
    Ok(materials)
}

/// Read the materials of a JSON property-bag file.
pub fn load_materials(path: &Path) -> Result<Vec<PropertyBag>, ConfigError> {
    parse_materials(&read(path)?, path)
}

/// Read a shading network saved as JSON.
pub fn load_network(path: &Path) -> Result<ShadingNetwork, ConfigError> {
    serde_json::from_str(&read(path)?).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}
