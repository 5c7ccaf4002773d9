//! Mapping expressions of a conversion recipe.
//!
//! A target parameter maps either to a bare source parameter name or to a
//! block. Block fields are all optional so that `case` branches can be merged
//! over their parent: a field present in the branch replaces the parent's,
//! an absent one leaves it alone.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Mapping for one target parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingExpr {
    /// Pass a source parameter through unchanged.
    Direct(String),
    Block(MappingBlock),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_parameter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_parameter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_map_parameter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_minus: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier_parameter: Option<String>,
    /// Constant emitted when nothing else applies.
    #[serde(rename = "value", alias = "direct_value", skip_serializing_if = "Option::is_none")]
    pub direct_value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<CaseBlock>,
}

impl MappingBlock {
    pub fn value(param: impl Into<String>) -> Self {
        Self {
            value_parameter: Some(param.into()),
            ..Default::default()
        }
    }

    pub fn with_map(mut self, param: impl Into<String>) -> Self {
        self.map_parameter = Some(param.into());
        self
    }

    pub fn with_use_map(mut self, param: impl Into<String>) -> Self {
        self.use_map_parameter = Some(param.into());
        self
    }

    pub fn with_multiplier(mut self, param: impl Into<String>) -> Self {
        self.multiplier_parameter = Some(param.into());
        self
    }

    pub fn one_minus(mut self) -> Self {
        self.one_minus = Some(true);
        self
    }

    pub fn map_required(mut self) -> Self {
        self.map_required = Some(true);
        self
    }

    pub fn is_one_minus(&self) -> bool {
        self.one_minus.unwrap_or(false)
    }

    pub fn is_map_required(&self) -> bool {
        self.map_required.unwrap_or(false)
    }

    /// Overlay the fields a branch sets. The branch's `case` always replaces
    /// the current one, so the chain ends when the branch declares none.
    pub fn merge(&mut self, branch: &MappingBlock) {
        fn overlay<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        overlay(&mut self.value_parameter, &branch.value_parameter);
        overlay(&mut self.map_parameter, &branch.map_parameter);
        overlay(&mut self.use_map_parameter, &branch.use_map_parameter);
        overlay(&mut self.one_minus, &branch.one_minus);
        overlay(&mut self.map_required, &branch.map_required);
        overlay(&mut self.multiplier_parameter, &branch.multiplier_parameter);
        overlay(&mut self.direct_value, &branch.direct_value);
        self.case = branch.case.clone();
    }
}

/// Branches selected by the stringified value of `case_parameter`.
///
/// On disk this is a single object: `case_parameter` plus one key per
/// branch, where `"+"` matches any truthy value without an exact key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<String, serde_json::Value>",
    into = "IndexMap<String, serde_json::Value>"
)]
pub struct CaseBlock {
    pub case_parameter: Option<String>,
    pub branches: IndexMap<String, MappingBlock>,
}

/// Key of the "any present value" branch.
pub const WILDCARD: &str = "+";

impl CaseBlock {
    pub fn new(case_parameter: impl Into<String>) -> Self {
        Self {
            case_parameter: Some(case_parameter.into()),
            branches: IndexMap::new(),
        }
    }

    pub fn branch(mut self, key: impl Into<String>, block: MappingBlock) -> Self {
        self.branches.insert(key.into(), block);
        self
    }

    /// Exact match first, then the wildcard when the value is truthy.
    pub fn select(&self, key: &str, truthy: bool) -> Option<&MappingBlock> {
        self.branches
            .get(key)
            .or_else(|| if truthy { self.branches.get(WILDCARD) } else { None })
    }
}

impl TryFrom<IndexMap<String, serde_json::Value>> for CaseBlock {
    type Error = String;

    fn try_from(mut raw: IndexMap<String, serde_json::Value>) -> Result<Self, Self::Error> {
        let case_parameter = match raw.shift_remove("case_parameter") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => return Err(format!("case_parameter must be a string, found {}", other)),
        };

        let mut branches = IndexMap::new();
        for (key, value) in raw {
            // Only object branches select anything.
            if !value.is_object() {
                log::debug!("ignoring non-object case branch '{}'", key);
                continue;
            }
            let block: MappingBlock = serde_json::from_value(value)
                .map_err(|e| format!("case branch '{}': {}", key, e))?;
            branches.insert(key, block);
        }

        Ok(Self {
            case_parameter,
            branches,
        })
    }
}

impl From<CaseBlock> for IndexMap<String, serde_json::Value> {
    fn from(case: CaseBlock) -> Self {
        let mut raw = IndexMap::new();
        if let Some(param) = case.case_parameter {
            raw.insert("case_parameter".to_string(), serde_json::Value::String(param));
        }
        for (key, block) in case.branches {
            if let Ok(value) = serde_json::to_value(block) {
                raw.insert(key, value);
            }
        }
        raw
    }
}
