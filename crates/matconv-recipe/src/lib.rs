//! Material definitions and conversion recipes.
//!
//! Recipes are JSON data files found under an ordered list of search roots:
//! `*.mat_def` files declare the typed inputs of a material in a domain, and
//! `*.material_conversion` files declare how each target parameter is
//! computed from source parameters.
//!
//! ```ignore
//! use matconv_recipe::RecipeCache;
//!
//! let index = RecipeCache::global().get_or_load(&roots);
//! let recipe = index.lookup("PhysicalMaterial", "3dsmax", "UsdPreviewSurface", "usd")?;
//! ```

pub mod cache;
pub mod definition;
pub mod expr;
pub mod index;
pub mod loader;

pub use cache::RecipeCache;
pub use definition::{ConversionRecipe, MaterialDefinition};
pub use expr::{CaseBlock, MappingBlock, MappingExpr, WILDCARD};
pub use index::RecipeIndex;
pub use loader::{
    gather_data_files, merge_roots, read_data_file, DataFileKind, MergedDocuments,
    CONVERSION_EXTENSION, MAT_DEF_EXTENSION,
};
