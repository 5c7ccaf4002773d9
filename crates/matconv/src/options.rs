//! Export and import options.

use indexmap::IndexMap;
use matconv_graph::{BuildSettings, ImportSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options of an export session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Ordered recipe search roots; later roots override earlier ones.
    pub recipe_roots: Vec<PathBuf>,
    /// Shader id every material is converted to.
    pub target_material_id: String,
    /// Scope holding materials and shared textures. A relative path is
    /// placed under the layer root.
    pub materials_root: String,
    /// Primvar read for map channel 1.
    pub st_primvar_name: String,
    /// Explicit map channel to primvar names.
    pub channel_primvars: IndexMap<u32, String>,
    pub relative_texture_paths: bool,
    /// Layer being written.
    pub layer_path: Option<PathBuf>,
    /// Texture files are baked by the host instead of referenced directly.
    pub bake: bool,
    pub bake_image_type: String,
    /// Directory of baked textures, relative to the layer.
    pub bake_dir: String,
    /// Package output; texture paths are kept absolute.
    pub usdz: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            recipe_roots: Vec::new(),
            target_material_id: "UsdPreviewSurface".to_string(),
            materials_root: "Materials".to_string(),
            st_primvar_name: "st".to_string(),
            channel_primvars: IndexMap::new(),
            relative_texture_paths: true,
            layer_path: None,
            bake: false,
            bake_image_type: "png".to_string(),
            bake_dir: "baked_textures".to_string(),
            usdz: false,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipe_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.recipe_roots.push(root.into());
        self
    }

    pub fn with_target_material_id(mut self, id: impl Into<String>) -> Self {
        self.target_material_id = id.into();
        self
    }

    pub fn with_materials_root(mut self, root: impl Into<String>) -> Self {
        self.materials_root = root.into();
        self
    }

    pub fn with_st_primvar_name(mut self, name: impl Into<String>) -> Self {
        self.st_primvar_name = name.into();
        self
    }

    pub fn with_channel_primvar(mut self, channel: u32, primvar: impl Into<String>) -> Self {
        self.channel_primvars.insert(channel, primvar.into());
        self
    }

    pub fn with_relative_texture_paths(mut self, relative: bool) -> Self {
        self.relative_texture_paths = relative;
        self
    }

    pub fn with_layer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.layer_path = Some(path.into());
        self
    }

    pub fn with_bake(mut self, bake: bool) -> Self {
        self.bake = bake;
        self
    }

    pub fn with_usdz(mut self, usdz: bool) -> Self {
        self.usdz = usdz;
        self
    }

    /// Absolute path of the materials scope.
    pub fn materials_root_path(&self) -> String {
        let root = self.materials_root.trim_end_matches('/');
        if root.starts_with('/') {
            root.to_string()
        } else if root.is_empty() {
            "/Materials".to_string()
        } else {
            format!("/{}", root)
        }
    }

    /// File a baked texture is rendered to.
    pub fn baked_texture_path(&self, texture_name: &str) -> PathBuf {
        let dir = self
            .layer_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("."));
        dir.join(&self.bake_dir)
            .join(format!("{}.{}", texture_name, self.bake_image_type))
    }

    pub(crate) fn build_settings(&self) -> BuildSettings {
        BuildSettings {
            materials_root: self.materials_root_path(),
            st_primvar_name: self.st_primvar_name.clone(),
            channel_primvars: self.channel_primvars.clone(),
            relative_texture_paths: self.relative_texture_paths && !self.usdz,
            layer_path: self.layer_path.clone(),
        }
    }
}

/// Options of an import session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub recipe_roots: Vec<PathBuf>,
    /// Native material class every shader is converted to.
    pub material_target_id: String,
    /// `Bitmaptexture`, or the file name of an OSL bitmap shader.
    pub texture_target_id: String,
    /// Primvar name to map channel.
    pub primvar_channels: IndexMap<String, u32>,
    /// Layer being read; relative texture paths resolve against its
    /// directory.
    pub layer_path: Option<PathBuf>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            recipe_roots: Vec::new(),
            material_target_id: "MaxUsdPreviewSurface".to_string(),
            texture_target_id: "Bitmaptexture".to_string(),
            primvar_channels: IndexMap::new(),
            layer_path: None,
        }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipe_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.recipe_roots.push(root.into());
        self
    }

    pub fn with_material_target_id(mut self, id: impl Into<String>) -> Self {
        self.material_target_id = id.into();
        self
    }

    pub fn with_texture_target_id(mut self, id: impl Into<String>) -> Self {
        self.texture_target_id = id.into();
        self
    }

    pub fn with_primvar_channel(mut self, primvar: impl Into<String>, channel: u32) -> Self {
        self.primvar_channels.insert(primvar.into(), channel);
        self
    }

    pub fn with_layer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.layer_path = Some(path.into());
        self
    }

    pub(crate) fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            texture_target_id: self.texture_target_id.clone(),
            primvar_channels: self.primvar_channels.clone(),
            layer_dir: self
                .layer_path
                .as_deref()
                .and_then(Path::parent)
                .map(Path::to_path_buf),
        }
    }
}
