//! Indexed material definitions and conversion recipes.

use indexmap::IndexMap;
use matconv_core::{Diagnostics, Domain, RecipeError, TypeTag};
use std::path::PathBuf;

use crate::definition::{
    ConversionRecipe, MaterialDefinition, RawConversion, RawMaterialDefinition,
};
use crate::loader::{merge_roots, MergedDocuments};

type RecipeKey = (String, Domain, String, Domain);

/// Everything loaded from one ordered set of search roots.
#[derive(Debug, Default)]
pub struct RecipeIndex {
    roots: Vec<PathBuf>,
    definitions: IndexMap<(String, Domain), MaterialDefinition>,
    recipes: IndexMap<RecipeKey, ConversionRecipe>,
    diagnostics: Diagnostics,
}

impl RecipeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and index every data file under `roots`. Problems with single
    /// files or entries are recorded as warnings and never abort the load.
    pub fn load(roots: &[PathBuf]) -> Self {
        let mut diagnostics = Diagnostics::new();
        let merged = merge_roots(roots, &mut diagnostics);
        let mut index = Self::from_documents(merged);
        index.roots = roots.to_vec();
        index.diagnostics.append(&mut diagnostics);
        index
    }

    /// Index already-merged top-level entries.
    pub fn from_documents(merged: MergedDocuments) -> Self {
        let mut index = Self::new();

        for (key, value) in merged.material_definitions {
            match parse_definition(&key, value) {
                Ok(def) => index.register_definition(def),
                Err(reason) => index.diagnostics.warn(format!(
                    "Material definition '{}' skipped: {}",
                    key, reason
                )),
            }
        }

        for (key, value) in merged.conversions {
            match index.parse_recipe(&key, value) {
                Ok(recipe) => index.register_recipe(recipe),
                Err(reason) => index
                    .diagnostics
                    .warn(format!("Material conversion '{}' skipped: {}", key, reason)),
            }
        }

        index
    }

    /// Add a definition. A later definition for the same `(id, domain)`
    /// replaces the earlier one.
    pub fn register_definition(&mut self, def: MaterialDefinition) {
        self.definitions
            .insert((def.id.clone(), def.domain.clone()), def);
    }

    /// Add a recipe. A later recipe for the same source/target pair
    /// replaces the earlier one.
    pub fn register_recipe(&mut self, recipe: ConversionRecipe) {
        let key = (
            recipe.source.id.clone(),
            recipe.source.domain.clone(),
            recipe.target.id.clone(),
            recipe.target.domain.clone(),
        );
        if let Some(existing) = self.recipes.get(&key) {
            log::debug!(
                "recipe '{}' overrides '{}' for the same materials",
                recipe.key,
                existing.key
            );
        }
        self.recipes.insert(key, recipe);
    }

    fn parse_recipe(&self, key: &str, value: serde_json::Value) -> Result<ConversionRecipe, String> {
        let raw: RawConversion = serde_json::from_value(value).map_err(|e| e.to_string())?;

        let source = raw.source_material.ok_or("missing 'source_material'")?;
        let source_id = source.id.ok_or("missing source 'id'")?;
        let source_domain = source.domain.ok_or("missing source 'domain'")?;
        let target = raw.target_material.ok_or("missing 'target_material'")?;
        let target_id = target.id.ok_or("missing target 'id'")?;
        let target_domain = target.domain.ok_or("missing target 'domain'")?;
        let mapping = raw.parameter_mapping.ok_or("missing 'parameter_mapping'")?;

        if mapping.mappings.is_empty() {
            return Err(RecipeError::EmptyMapping { key: key.to_string() }.to_string());
        }

        let resolve = |id: &str, domain: &str| {
            self.material_definition(id, domain).cloned().map_err(|_| {
                RecipeError::UndefinedMaterial {
                    key: key.to_string(),
                    id: id.to_string(),
                    domain: domain.to_string(),
                }
                .to_string()
            })
        };

        Ok(ConversionRecipe {
            key: key.to_string(),
            source: resolve(&source_id, &source_domain)?,
            target: resolve(&target_id, &target_domain)?,
            mappings: mapping.mappings,
        })
    }

    /// The recipe converting `source_id` in `source_domain` to `target_id`
    /// in `target_domain`.
    pub fn lookup(
        &self,
        source_id: &str,
        source_domain: &str,
        target_id: &str,
        target_domain: &str,
    ) -> Result<&ConversionRecipe, RecipeError> {
        let key = (
            source_id.to_string(),
            Domain::parse(source_domain),
            target_id.to_string(),
            Domain::parse(target_domain),
        );
        self.recipes.get(&key).ok_or_else(|| RecipeError::RecipeNotFound {
            source_id: source_id.to_string(),
            source_domain: source_domain.to_string(),
            target_id: target_id.to_string(),
            target_domain: target_domain.to_string(),
        })
    }

    pub fn material_definition(&self, id: &str, domain: &str) -> Result<&MaterialDefinition, RecipeError> {
        self.definitions
            .get(&(id.to_string(), Domain::parse(domain)))
            .ok_or_else(|| RecipeError::MaterialDefinitionNotFound {
                id: id.to_string(),
                domain: domain.to_string(),
            })
    }

    pub fn definitions(&self) -> impl Iterator<Item = &MaterialDefinition> {
        self.definitions.values()
    }

    pub fn recipes(&self) -> impl Iterator<Item = &ConversionRecipe> {
        self.recipes.values()
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Warnings raised while loading.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

fn parse_definition(key: &str, value: serde_json::Value) -> Result<MaterialDefinition, String> {
    let raw: RawMaterialDefinition = serde_json::from_value(value).map_err(|e| e.to_string())?;
    let id = raw.id.filter(|s| !s.is_empty()).ok_or("missing 'id'")?;
    let domain = raw.domain.filter(|s| !s.is_empty()).ok_or("missing 'domain'")?;
    log::debug!("material definition '{}': {} ({})", key, id, domain);

    Ok(MaterialDefinition {
        id,
        domain: Domain::parse(&domain),
        inputs: raw
            .inputs
            .iter()
            .map(|(name, tag)| (name.clone(), TypeTag::parse(tag)))
            .collect(),
    })
}
