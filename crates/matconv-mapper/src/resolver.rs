//! Evaluation of mapping expressions against a source material.

use indexmap::IndexMap;
use matconv_core::{
    case_key, Color, Diagnostics, MappingError, PropertyReadable, TypeTag, Value,
};
use matconv_recipe::{ConversionRecipe, MappingBlock, MappingExpr};

/// Maximum number of nested `case` blocks followed for one parameter.
pub const MAX_CASE_DEPTH: usize = 16;

/// Target parameter values computed from a source material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedMapping {
    /// Target parameter to value, in recipe order. `None` leaves the target
    /// parameter at its default.
    pub values: IndexMap<String, Option<Value>>,
    /// Parameters skipped because of an error.
    pub diagnostics: Diagnostics,
}

impl ResolvedMapping {
    pub fn get(&self, target: &str) -> Option<&Value> {
        self.values.get(target).and_then(Option::as_ref)
    }

    /// Parameters that received a value.
    pub fn assigned(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Compute every target parameter of `recipe` from `source`.
///
/// An error in one parameter skips only that parameter; it is logged and
/// recorded in the result's diagnostics. A recipe with no mappings fails
/// outright.
pub fn resolve(
    source: &dyn PropertyReadable,
    recipe: &ConversionRecipe,
) -> Result<ResolvedMapping, MappingError> {
    if recipe.mappings.is_empty() {
        return Err(MappingError::EmptyMapping);
    }

    let mut resolved = ResolvedMapping::default();
    for (target, expr) in &recipe.mappings {
        let target_type = recipe.target_input_type(target);
        let resolver = ParameterResolver {
            source,
            target,
            target_type,
        };
        match resolver.resolve(expr) {
            Ok(value) => {
                resolved.values.insert(target.clone(), value);
            }
            Err(err) => resolved.diagnostics.error(format!(
                "{}: skipping parameter '{}' of {}: {}",
                recipe.key,
                target,
                source.name(),
                err
            )),
        }
    }
    Ok(resolved)
}

/// Evaluates the expression of a single target parameter.
struct ParameterResolver<'a> {
    source: &'a dyn PropertyReadable,
    target: &'a str,
    target_type: Option<&'a TypeTag>,
}

impl ParameterResolver<'_> {
    fn resolve(&self, expr: &MappingExpr) -> Result<Option<Value>, MappingError> {
        let value = match expr {
            MappingExpr::Direct(param) => self.source.get(param),
            MappingExpr::Block(block) => {
                let block = self.follow_cases(block)?;
                self.resolve_block(&block)?
            }
        };

        // A texture feeding a "map enabled" flag just turns it on.
        if matches!(self.target_type, Some(TypeTag::UseMap)) {
            if let Some(Value::Texture(_)) = value {
                return Ok(Some(Value::Bool(true)));
            }
        }
        Ok(value)
    }

    /// Merge selected `case` branches into the block until a branch has no
    /// further `case`.
    fn follow_cases(&self, block: &MappingBlock) -> Result<MappingBlock, MappingError> {
        let mut merged = block.clone();
        let mut depth = 0;

        while let Some(case) = merged.case.take() {
            depth += 1;
            if depth > MAX_CASE_DEPTH {
                return Err(MappingError::CaseDepthExceeded {
                    target: self.target.to_string(),
                    depth: MAX_CASE_DEPTH,
                });
            }

            let param = case
                .case_parameter
                .as_deref()
                .ok_or_else(|| MappingError::MissingCaseParameter {
                    target: self.target.to_string(),
                })?;
            let value = self.source.get(param);
            let key = case_key(value.as_ref());
            let truthy = value.as_ref().is_some_and(Value::is_truthy);

            match case.select(&key, truthy) {
                Some(branch) => {
                    log::trace!("{}: case {}={} selected", self.target, param, key);
                    merged.merge(branch);
                }
                None => break,
            }
        }
        Ok(merged)
    }

    fn resolve_block(&self, block: &MappingBlock) -> Result<Option<Value>, MappingError> {
        if let Some(map_param) = &block.map_parameter {
            let use_map = match &block.use_map_parameter {
                Some(param) => self.source.get(param).is_some_and(|v| v.is_truthy()),
                None => true,
            };
            let map = self.source.get(map_param);
            if let Some(map) = map.filter(|m| use_map && m.is_truthy()) {
                return Ok(Some(map));
            }
            if block.is_map_required() {
                return Ok(None);
            }
        }

        if let Some(value_param) = &block.value_parameter {
            let Some(mut value) = self.source.get(value_param) else {
                return Ok(None);
            };
            if block.is_one_minus() {
                value = value.one_minus().ok_or_else(|| self.non_numeric(value_param, Some(&value)))?;
            }
            if let Some(mult_param) = &block.multiplier_parameter {
                let factor = self.source.get(mult_param);
                value = factor
                    .as_ref()
                    .and_then(|f| value.multiplied_by(f))
                    .ok_or_else(|| self.non_numeric(mult_param, factor.as_ref()))?;
            }
            if !block.is_map_required() {
                return Ok(Some(value));
            }
        }

        if let Some(json) = &block.direct_value {
            if let Some(value) = self.coerce_literal(json).filter(Value::is_truthy) {
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    /// Convert a recipe literal to the target input's type.
    fn coerce_literal(&self, json: &serde_json::Value) -> Option<Value> {
        let tag = self.target_type;
        let value = Value::from_json(json, tag.is_some_and(TypeTag::is_color))?;
        let coerced = match (tag, value) {
            (Some(TypeTag::Float), v) => v.as_f64().map(Value::Float)?,
            (Some(TypeTag::Int), Value::Float(f)) => Value::Int(f as i64),
            (Some(TypeTag::Int), Value::Bool(b)) => Value::Int(i64::from(b)),
            (Some(TypeTag::Boolean | TypeTag::UseMap), v) => Value::Bool(v.is_truthy()),
            (Some(t), v) if t.is_color() => match v.as_f64() {
                Some(f) => Value::Color(Color::rgb(f, f, f)),
                None => v,
            },
            (_, v) => v,
        };
        Some(coerced)
    }

    fn non_numeric(&self, parameter: &str, found: Option<&Value>) -> MappingError {
        MappingError::NonNumeric {
            target: self.target.to_string(),
            parameter: parameter.to_string(),
            found: found.map(Value::type_name).unwrap_or("None").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matconv_core::{Domain, PropertyBag, TextureReference};
    use matconv_recipe::{CaseBlock, MaterialDefinition, WILDCARD};

    fn recipe(mappings: Vec<(&str, MappingExpr)>) -> ConversionRecipe {
        let target = MaterialDefinition::new("UsdPreviewSurface", Domain::Usd)
            .with_input("roughness", TypeTag::Float)
            .with_input("diffuseColor", TypeTag::Color3f)
            .with_input("useSpecularWorkflow", TypeTag::Int)
            .with_input("bump_map_on", TypeTag::UseMap);
        ConversionRecipe {
            key: "test".into(),
            source: MaterialDefinition::new("PhysicalMaterial", Domain::Max),
            target,
            mappings: mappings
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    fn roughness_recipe() -> ConversionRecipe {
        let block = MappingBlock {
            case: Some(
                CaseBlock::new("roughness_inv")
                    .branch("True", MappingBlock::value("roughness").one_minus())
                    .branch("False", MappingBlock::value("roughness")),
            ),
            ..MappingBlock::default().with_map("roughness_map")
        };
        recipe(vec![("roughness", MappingExpr::Block(block))])
    }

    fn texture(name: &str) -> Value {
        Value::texture(TextureReference::new(name, format!("{}.png", name)))
    }

    fn approx(value: Option<&Value>, expected: f64) {
        match value {
            Some(Value::Float(f)) => assert!((f - expected).abs() < 1e-9, "{} != {}", f, expected),
            other => panic!("expected float {}, got {:?}", expected, other),
        }
    }

    #[test]
    fn test_direct_mapping() {
        let source = PropertyBag::new("PhysicalMaterial").with("base_color", Color::rgb(1.0, 0.0, 0.0));
        let r = recipe(vec![("diffuseColor", MappingExpr::Direct("base_color".into()))]);
        let resolved = resolve(&source, &r).unwrap();
        assert_eq!(resolved.get("diffuseColor"), Some(&Value::Color(Color::rgb(1.0, 0.0, 0.0))));
    }

    #[test]
    fn test_case_one_minus() {
        let source = PropertyBag::new("PhysicalMaterial")
            .with("roughness", 0.333)
            .with("roughness_inv", true);
        let resolved = resolve(&source, &roughness_recipe()).unwrap();
        approx(resolved.get("roughness"), 0.667);

        let source = PropertyBag::new("PhysicalMaterial")
            .with("roughness", 0.333)
            .with("roughness_inv", false);
        let resolved = resolve(&source, &roughness_recipe()).unwrap();
        approx(resolved.get("roughness"), 0.333);
    }

    #[test]
    fn test_map_wins_over_value() {
        let source = PropertyBag::new("PhysicalMaterial")
            .with("roughness", 0.333)
            .with("roughness_inv", true)
            .with("roughness_map", texture("rough"));
        let resolved = resolve(&source, &roughness_recipe()).unwrap();
        assert!(resolved.get("roughness").unwrap().is_texture());
    }

    #[test]
    fn test_use_map_gate() {
        let block = MappingBlock::value("roughness")
            .with_map("roughness_map")
            .with_use_map("roughness_map_on");
        let r = recipe(vec![("roughness", MappingExpr::Block(block))]);

        let off = PropertyBag::new("PhysicalMaterial")
            .with("roughness", 0.5)
            .with("roughness_map", texture("rough"))
            .with("roughness_map_on", false);
        approx(resolve(&off, &r).unwrap().get("roughness"), 0.5);

        let on = off.clone().with("roughness_map_on", true);
        assert!(resolve(&on, &r).unwrap().get("roughness").unwrap().is_texture());
    }

    #[test]
    fn test_map_required_without_map() {
        let block = MappingBlock::value("bump_amount")
            .with_map("bump_map")
            .map_required();
        let r = recipe(vec![("normal", MappingExpr::Block(block))]);
        let source = PropertyBag::new("PhysicalMaterial").with("bump_amount", 0.3);

        let resolved = resolve(&source, &r).unwrap();
        assert_eq!(resolved.values.get("normal"), Some(&None));
    }

    #[test]
    fn test_map_required_value_falls_through_to_literal() {
        // Without a map parameter, a map_required value is never emitted.
        let block = MappingBlock {
            direct_value: Some(serde_json::json!(0.25)),
            ..MappingBlock::value("roughness").map_required()
        };
        let r = recipe(vec![("roughness", MappingExpr::Block(block))]);
        let source = PropertyBag::new("PhysicalMaterial").with("roughness", 0.9);
        approx(resolve(&source, &r).unwrap().get("roughness"), 0.25);
    }

    #[test]
    fn test_missing_value_is_none() {
        let r = recipe(vec![("roughness", MappingExpr::Block(MappingBlock::value("absent")))]);
        let resolved = resolve(&PropertyBag::new("PhysicalMaterial"), &r).unwrap();
        assert_eq!(resolved.values.get("roughness"), Some(&None));
        assert!(resolved.diagnostics.is_empty());
    }

    #[test]
    fn test_multiplier() {
        let block = MappingBlock::value("base_color").with_multiplier("base_weight");
        let r = recipe(vec![("diffuseColor", MappingExpr::Block(block))]);
        let source = PropertyBag::new("PhysicalMaterial")
            .with("base_color", Color::rgb(1.0, 0.5, 0.0))
            .with("base_weight", 0.5);
        assert_eq!(
            resolve(&source, &r).unwrap().get("diffuseColor"),
            Some(&Value::Color(Color::rgb(0.5, 0.25, 0.0)))
        );
    }

    #[test]
    fn test_integer_multiplier_overflow() {
        let block = MappingBlock::value("spec_mode").with_multiplier("spec_scale");
        let r = recipe(vec![("useSpecularWorkflow", MappingExpr::Block(block))]);
        let source = PropertyBag::new("PhysicalMaterial")
            .with("spec_mode", i64::MAX)
            .with("spec_scale", 2i64);
        let resolved = resolve(&source, &r).unwrap();
        assert_eq!(
            resolved.get("useSpecularWorkflow"),
            Some(&Value::Float(i64::MAX as f64 * 2.0))
        );
        assert!(resolved.diagnostics.is_empty());
    }

    #[test]
    fn test_non_numeric_multiplier_skips_parameter() {
        let block = MappingBlock::value("roughness").with_multiplier("label");
        let r = recipe(vec![
            ("roughness", MappingExpr::Block(block)),
            ("diffuseColor", MappingExpr::Direct("base_color".into())),
        ]);
        let source = PropertyBag::new("PhysicalMaterial")
            .with("roughness", 0.5)
            .with("label", "heavy")
            .with("base_color", Color::rgb(0.1, 0.2, 0.3));

        let resolved = resolve(&source, &r).unwrap();
        assert!(!resolved.values.contains_key("roughness"));
        assert!(resolved.get("diffuseColor").is_some());
        assert_eq!(resolved.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_direct_value_coerced_to_target_type() {
        let color = MappingBlock {
            direct_value: Some(serde_json::json!([0.2, 0.4, 0.6])),
            ..Default::default()
        };
        let int = MappingBlock {
            direct_value: Some(serde_json::json!(1.0)),
            ..Default::default()
        };
        let zero = MappingBlock {
            direct_value: Some(serde_json::json!(0.0)),
            ..Default::default()
        };
        let r = recipe(vec![
            ("diffuseColor", MappingExpr::Block(color)),
            ("useSpecularWorkflow", MappingExpr::Block(int)),
            ("roughness", MappingExpr::Block(zero)),
        ]);
        let resolved = resolve(&PropertyBag::new("PhysicalMaterial"), &r).unwrap();
        assert_eq!(
            resolved.get("diffuseColor"),
            Some(&Value::Color(Color::rgb(0.2, 0.4, 0.6)))
        );
        assert_eq!(resolved.get("useSpecularWorkflow"), Some(&Value::Int(1)));
        // A falsy literal leaves the target at its default.
        assert_eq!(resolved.get("roughness"), None);
    }

    #[test]
    fn test_nested_case_and_wildcard() {
        let inner = CaseBlock::new("coating")
            .branch("0", MappingBlock::value("plain"))
            .branch(WILDCARD, MappingBlock::value("coated"));
        let outer = CaseBlock::new("mode").branch(
            "advanced",
            MappingBlock {
                case: Some(inner),
                ..Default::default()
            },
        );
        let block = MappingBlock {
            case: Some(outer),
            ..MappingBlock::value("simple")
        };
        let r = recipe(vec![("roughness", MappingExpr::Block(block))]);

        let base = PropertyBag::new("PhysicalMaterial")
            .with("simple", 0.1)
            .with("plain", 0.2)
            .with("coated", 0.3);
        approx(resolve(&base, &r).unwrap().get("roughness"), 0.1);

        let advanced = base.clone().with("mode", "advanced").with("coating", 0i64);
        approx(resolve(&advanced, &r).unwrap().get("roughness"), 0.2);

        let coated = base.with("mode", "advanced").with("coating", 0.5);
        approx(resolve(&coated, &r).unwrap().get("roughness"), 0.3);
    }

    #[test]
    fn test_missing_case_parameter() {
        let block = MappingBlock {
            case: Some(CaseBlock::default()),
            ..MappingBlock::value("roughness")
        };
        let r = recipe(vec![("roughness", MappingExpr::Block(block))]);
        let resolved = resolve(&PropertyBag::new("PhysicalMaterial").with("roughness", 0.5), &r).unwrap();
        assert!(resolved.values.is_empty());
        assert_eq!(resolved.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_case_depth_exceeded() {
        let mut block = MappingBlock::value("roughness");
        for _ in 0..=MAX_CASE_DEPTH {
            block = MappingBlock {
                case: Some(CaseBlock::new("loop").branch(WILDCARD, block)),
                ..Default::default()
            };
        }
        let r = recipe(vec![("roughness", MappingExpr::Block(block))]);
        let source = PropertyBag::new("PhysicalMaterial")
            .with("loop", true)
            .with("roughness", 0.5);
        let resolved = resolve(&source, &r).unwrap();
        assert!(resolved.values.is_empty());
        assert!(resolved.diagnostics.errors().any(|d| d.message.contains("maximum depth")));
    }

    #[test]
    fn test_texture_into_use_map_flag() {
        let r = recipe(vec![("bump_map_on", MappingExpr::Direct("bump_map".into()))]);
        let source = PropertyBag::new("PhysicalMaterial").with("bump_map", texture("bump"));
        assert_eq!(resolve(&source, &r).unwrap().get("bump_map_on"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_empty_recipe_is_error() {
        let r = recipe(vec![]);
        assert!(matches!(
            resolve(&PropertyBag::new("PhysicalMaterial"), &r),
            Err(MappingError::EmptyMapping)
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolve_is_idempotent(roughness in 0.0f64..1.0, inv in any::<bool>(), with_map in any::<bool>()) {
                let mut source = PropertyBag::new("PhysicalMaterial")
                    .with("roughness", roughness)
                    .with("roughness_inv", inv);
                if with_map {
                    source.set("roughness_map", texture("rough"));
                }
                let r = roughness_recipe();
                let first = resolve(&source, &r).unwrap();
                let second = resolve(&source, &r).unwrap();
                prop_assert_eq!(first, second);
            }

            #[test]
            fn one_minus_complements(roughness in 0.0f64..1.0) {
                let source = PropertyBag::new("PhysicalMaterial")
                    .with("roughness", roughness)
                    .with("roughness_inv", true);
                let resolved = resolve(&source, &roughness_recipe()).unwrap();
                match resolved.get("roughness") {
                    Some(Value::Float(f)) => prop_assert!((f + roughness - 1.0).abs() < 1e-12),
                    other => prop_assert!(false, "unexpected {:?}", other),
                }
            }
        }
    }
}
