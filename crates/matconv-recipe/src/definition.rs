//! Material definitions and conversion recipes.

use indexmap::IndexMap;
use matconv_core::{Domain, TypeTag};
use serde::{Deserialize, Serialize};

use crate::expr::MappingExpr;

/// The inputs of one material type in one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDefinition {
    pub id: String,
    pub domain: Domain,
    /// Parameter name to type tag, in declaration order.
    pub inputs: IndexMap<String, TypeTag>,
}

impl MaterialDefinition {
    pub fn new(id: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: id.into(),
            domain,
            inputs: IndexMap::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, tag: TypeTag) -> Self {
        self.inputs.insert(name.into(), tag);
        self
    }

    pub fn input_type(&self, name: &str) -> Option<&TypeTag> {
        self.inputs.get(name)
    }

    pub fn matches(&self, id: &str, domain: &Domain) -> bool {
        self.id == id && &self.domain == domain
    }
}

/// A parameter mapping from one material type to another.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRecipe {
    /// Top-level key of the entry in its data file.
    pub key: String,
    pub source: MaterialDefinition,
    pub target: MaterialDefinition,
    /// Target parameter to mapping, in recipe order.
    pub mappings: IndexMap<String, MappingExpr>,
}

impl ConversionRecipe {
    /// Type of the source input feeding `target_param`. Blocks are typed by
    /// their map parameter.
    pub fn source_input_type(&self, target_param: &str) -> Option<&TypeTag> {
        let source_param = match self.mappings.get(target_param)? {
            MappingExpr::Direct(name) => name.as_str(),
            MappingExpr::Block(block) => block.map_parameter.as_deref()?,
        };
        self.source.input_type(source_param)
    }

    pub fn target_input_type(&self, target_param: &str) -> Option<&TypeTag> {
        self.target.input_type(target_param)
    }
}

// On-disk shapes. Every field is optional so that a bad entry can be
// reported by name instead of failing the whole file.

#[derive(Debug, Deserialize)]
pub(crate) struct RawMaterialDefinition {
    pub id: Option<String>,
    pub domain: Option<String>,
    #[serde(default)]
    pub inputs: IndexMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMaterialRef {
    pub id: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawParameterMapping {
    #[serde(default)]
    pub mappings: IndexMap<String, MappingExpr>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawConversion {
    pub source_material: Option<RawMaterialRef>,
    pub target_material: Option<RawMaterialRef>,
    pub parameter_mapping: Option<RawParameterMapping>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::MappingBlock;

    #[test]
    fn test_source_input_type() {
        let source = MaterialDefinition::new("PhysicalMaterial", Domain::Max)
            .with_input("roughness", TypeTag::Float)
            .with_input("roughness_map", TypeTag::TextureMap)
            .with_input("bump_map", TypeTag::NormalMap);
        let target = MaterialDefinition::new("UsdPreviewSurface", Domain::Usd)
            .with_input("roughness", TypeTag::Float)
            .with_input("normal", TypeTag::Normal3f);

        let mut mappings = IndexMap::new();
        mappings.insert(
            "roughness".to_string(),
            MappingExpr::Block(MappingBlock::value("roughness").with_map("roughness_map")),
        );
        mappings.insert("normal".to_string(), MappingExpr::Direct("bump_map".into()));

        let recipe = ConversionRecipe {
            key: "physical_to_preview".into(),
            source,
            target,
            mappings,
        };

        assert_eq!(recipe.source_input_type("roughness"), Some(&TypeTag::TextureMap));
        assert_eq!(recipe.source_input_type("normal"), Some(&TypeTag::NormalMap));
        assert_eq!(recipe.source_input_type("missing"), None);
        assert_eq!(recipe.target_input_type("normal"), Some(&TypeTag::Normal3f));
    }
}
