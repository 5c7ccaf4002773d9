//! Shading network construction and reading for matconv.
//!
//! Export writes resolved materials into a [`ShadingNetwork`] document:
//! one shader per material, shared texture node graphs reused across
//! materials, and a material-local reference for every texture a material
//! consumes. Import reads a network shader back through
//! [`PropertyReadable`](matconv_core::PropertyReadable) and assigns the
//! resolved values onto native material tables.
//!
//! # Example
//!
//! ```ignore
//! use matconv_graph::{usda, BuildSettings, GraphBuilder, ShadingNetwork, TextureCache};
//!
//! let mut network = ShadingNetwork::new();
//! let settings = BuildSettings::default();
//! let mut cache = TextureCache::new();
//! let resolved = matconv_mapper::resolve(&material, recipe)?;
//! GraphBuilder::new(&mut network, &settings).build("/Materials/Floor", &resolved, recipe, &mut cache)?;
//! println!("{}", usda::write_network(&network));
//! ```

pub mod export;
pub mod import;
pub mod network;
pub mod paths;
pub mod udim;
pub mod usda;

pub use export::{BuildReport, BuildSettings, GraphBuilder, TextureCache};
pub use import::{
    import_texture_placement, ChannelSelector, ImportBuilder, ImportReport, ImportSettings,
    NativeMaterial, NativeProperty, NativeTexture, NativeTextureCache, NetworkShader, TextureSlot,
};
pub use network::{AttrValue, Attribute, Connection, Prim, PrimKind, ShadingNetwork, ValueType};
pub use usda::write_network;
