//! Material conversion between 3ds Max materials and USD shading networks.
//!
//! This crate ties the pipeline together:
//! - `matconv-recipe` finds the conversion recipe for a material type
//! - `matconv-mapper` computes every target parameter from the source
//! - `matconv-uv` resolves texture placements into `UsdTransform2d` values
//! - `matconv-graph` writes (or reads) the shading network
//!
//! ## Example
//!
//! ```ignore
//! use matconv::{ExportOptions, ExportSession};
//! use matconv_core::{Color, PropertyBag};
//!
//! let options = ExportOptions::new()
//!     .with_recipe_root("/opt/matconv/data")
//!     .with_layer_path("/out/scene.usda");
//! let mut session = ExportSession::new(options);
//!
//! let floor = PropertyBag::new("PhysicalMaterial")
//!     .named("Floor")
//!     .with("base_color", Color::rgb(0.8, 0.6, 0.4));
//! let report = session.export_material(&floor)?;
//! std::fs::write("/out/scene.usda", session.to_usda())?;
//! ```

pub mod options;
pub mod session;
pub mod source;

pub use options::{ExportOptions, ImportOptions};
pub use session::{BakeRequest, ExportSession, ImportSession, Outcome, MAX_DOMAIN, USD_DOMAIN};
pub use source::{load_materials, load_network, parse_materials};

pub use matconv_core as core;
pub use matconv_graph as graph;
pub use matconv_mapper as mapper;
pub use matconv_recipe as recipe;
pub use matconv_uv as uv;
