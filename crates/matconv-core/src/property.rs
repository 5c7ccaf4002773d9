//! Read access to material parameters.

use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A material or shader whose parameters can be read by name.
///
/// Implemented once per domain so the mapper never branches on where a
/// value comes from.
pub trait PropertyReadable {
    /// Class or shader id used to pick a conversion recipe.
    fn class_id(&self) -> &str;

    /// Display name used in diagnostics.
    fn name(&self) -> &str;

    /// Current value of a parameter, `None` when unset or unknown.
    fn get(&self, param: &str) -> Option<Value>;
}

/// An in-memory material: a class id plus named values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyBag {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
}

impl PropertyBag {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with(mut self, param: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(param.into(), value.into());
        self
    }

    pub fn set(&mut self, param: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(param.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl PropertyReadable for PropertyBag {
    fn class_id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    fn get(&self, param: &str) -> Option<Value> {
        self.properties.get(param).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_bag() {
        let bag = PropertyBag::new("PhysicalMaterial")
            .with("roughness", 0.25)
            .with("roughness_inv", true);

        assert_eq!(bag.class_id(), "PhysicalMaterial");
        assert_eq!(bag.name(), "PhysicalMaterial");
        assert_eq!(bag.get("roughness"), Some(Value::Float(0.25)));
        assert_eq!(bag.get("missing"), None);
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_property_bag_json() {
        let bag: PropertyBag = serde_json::from_str(
            r#"{"id": "PhysicalMaterial", "name": "Floor", "properties": {"metalness": {"float": 1.0}}}"#,
        )
        .unwrap();
        assert_eq!(bag.name(), "Floor");
        assert_eq!(bag.get("metalness"), Some(Value::Float(1.0)));
    }
}
