//! In-memory shading network document.
//!
//! A flat, path-keyed set of prims: materials, node graphs and shaders, with
//! typed inputs and outputs that either hold a value or connect to another
//! prim's attribute. Prims keep their definition order, which is also the
//! order they are written in.

use indexmap::IndexMap;
use matconv_core::GraphError;
use serde::{Deserialize, Serialize};

use crate::usda::sanitize_name;

/// Prim type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimKind {
    Scope,
    Material,
    NodeGraph,
    Shader,
}

impl PrimKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimKind::Scope => "Scope",
            PrimKind::Material => "Material",
            PrimKind::NodeGraph => "NodeGraph",
            PrimKind::Shader => "Shader",
        }
    }
}

/// Attribute value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Float,
    Int,
    Float2,
    Float3,
    Float4,
    Color3f,
    Normal3f,
    Token,
    String,
    Asset,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::Int => "int",
            ValueType::Float2 => "float2",
            ValueType::Float3 => "float3",
            ValueType::Float4 => "float4",
            ValueType::Color3f => "color3f",
            ValueType::Normal3f => "normal3f",
            ValueType::Token => "token",
            ValueType::String => "string",
            ValueType::Asset => "asset",
        }
    }
}

/// An authored attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    Float(f64),
    Int(i64),
    Float2([f64; 2]),
    /// Any three-component type: float3, color3f, normal3f.
    Float3([f64; 3]),
    Float4([f64; 4]),
    Token(String),
    String(String),
    Asset(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_float2(&self) -> Option<[f64; 2]> {
        match self {
            AttrValue::Float2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Token(s) | AttrValue::String(s) | AttrValue::Asset(s) => Some(s),
            _ => None,
        }
    }
}

/// Source end of a connection: a prim path plus a namespaced attribute,
/// e.g. `outputs:rgb` or `inputs:frame:st`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub prim: String,
    pub attribute: String,
}

impl Connection {
    pub fn output(prim: impl Into<String>, name: &str) -> Self {
        Self {
            prim: prim.into(),
            attribute: format!("outputs:{}", name),
        }
    }

    pub fn input(prim: impl Into<String>, name: &str) -> Self {
        Self {
            prim: prim.into(),
            attribute: format!("inputs:{}", name),
        }
    }

    /// Attribute name without its `inputs:` / `outputs:` namespace.
    pub fn base_name(&self) -> &str {
        self.attribute
            .strip_prefix("outputs:")
            .or_else(|| self.attribute.strip_prefix("inputs:"))
            .unwrap_or(&self.attribute)
    }

    pub fn is_output(&self) -> bool {
        self.attribute.starts_with("outputs:")
    }
}

/// An input or output of a prim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
}

impl Attribute {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            value: None,
            connection: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prim {
    pub path: String,
    pub kind: PrimKind,
    /// `info:id` of a shader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shader_id: Option<String>,
    #[serde(default)]
    pub inputs: IndexMap<String, Attribute>,
    #[serde(default)]
    pub outputs: IndexMap<String, Attribute>,
    /// Internal references to other prims of the same document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl Prim {
    pub fn new(path: impl Into<String>, kind: PrimKind) -> Self {
        Self {
            path: path.into(),
            kind,
            shader_id: None,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            references: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        prim_name(&self.path)
    }

    pub fn input(&self, name: &str) -> Option<&Attribute> {
        self.inputs.get(name)
    }

    pub fn input_value(&self, name: &str) -> Option<&AttrValue> {
        self.inputs.get(name).and_then(|a| a.value.as_ref())
    }

    pub fn input_connection(&self, name: &str) -> Option<&Connection> {
        self.inputs.get(name).and_then(|a| a.connection.as_ref())
    }

    /// Author a value, creating the input if needed.
    pub fn set_input(&mut self, name: &str, value_type: ValueType, value: AttrValue) {
        let attr = self
            .inputs
            .entry(name.to_string())
            .or_insert_with(|| Attribute::new(value_type));
        attr.value_type = value_type;
        attr.value = Some(value);
    }

    pub fn connect_input(&mut self, name: &str, value_type: ValueType, source: Connection) {
        let attr = self
            .inputs
            .entry(name.to_string())
            .or_insert_with(|| Attribute::new(value_type));
        attr.value_type = value_type;
        attr.connection = Some(source);
    }

    pub fn create_output(&mut self, name: &str, value_type: ValueType) {
        self.outputs
            .entry(name.to_string())
            .or_insert_with(|| Attribute::new(value_type));
    }

    pub fn connect_output(&mut self, name: &str, value_type: ValueType, source: Connection) {
        let attr = self
            .outputs
            .entry(name.to_string())
            .or_insert_with(|| Attribute::new(value_type));
        attr.connection = Some(source);
    }

    pub fn add_reference(&mut self, target: &str) {
        if !self.references.iter().any(|r| r == target) {
            self.references.push(target.to_string());
        }
    }
}

/// A shading network document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadingNetwork {
    prims: IndexMap<String, Prim>,
}

impl ShadingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a prim, or return the existing one at `path`. Missing
    /// ancestors are defined as scopes.
    pub fn define(&mut self, path: &str, kind: PrimKind) -> Result<&mut Prim, GraphError> {
        validate_path(path)?;
        let mut ancestors = Vec::new();
        let mut parent = parent_path(path);
        while let Some(p) = parent {
            if p == "/" || self.prims.contains_key(p) {
                break;
            }
            ancestors.push(p.to_string());
            parent = parent_path(p);
        }
        for ancestor in ancestors.into_iter().rev() {
            self.prims
                .insert(ancestor.clone(), Prim::new(ancestor, PrimKind::Scope));
        }

        let prim = self
            .prims
            .entry(path.to_string())
            .or_insert_with(|| Prim::new(path, kind));
        Ok(prim)
    }

    pub fn get(&self, path: &str) -> Option<&Prim> {
        self.prims.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Prim> {
        self.prims.get_mut(path)
    }

    pub fn prim(&self, path: &str) -> Result<&Prim, GraphError> {
        self.get(path)
            .ok_or_else(|| GraphError::MissingPrim(path.to_string()))
    }

    pub fn prim_mut(&mut self, path: &str) -> Result<&mut Prim, GraphError> {
        self.prims
            .get_mut(path)
            .ok_or_else(|| GraphError::MissingPrim(path.to_string()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.prims.contains_key(path)
    }

    pub fn prims(&self) -> impl Iterator<Item = &Prim> {
        self.prims.values()
    }

    /// Direct children of `path`, in definition order.
    pub fn children<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Prim> + 'a {
        self.prims
            .values()
            .filter(move |p| parent_path(&p.path) == Some(path))
    }

    /// Shaders with the given `info:id`.
    pub fn shaders_with_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Prim> + 'a {
        self.prims
            .values()
            .filter(move |p| p.kind == PrimKind::Shader && p.shader_id.as_deref() == Some(id))
    }

    /// A free child path under `parent` for `name`: the sanitized name, or
    /// the first of `name_1`, `name_2`, ... not already defined.
    pub fn uniquify_child(&self, parent: &str, name: &str) -> String {
        let base = sanitize_name(name);
        let mut candidate = child_path(parent, &base);
        let mut n = 1;
        while self.contains(&candidate) {
            candidate = child_path(parent, &format!("{}_{}", base, n));
            n += 1;
        }
        candidate
    }

    pub fn len(&self) -> usize {
        self.prims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prims.is_empty()
    }
}

pub fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent of an absolute prim path; `None` for the root itself.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

pub fn prim_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Absolute path whose every element is a valid identifier.
pub fn validate_path(path: &str) -> Result<(), GraphError> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(GraphError::InvalidPath(path.to_string()));
    };
    let valid = !rest.is_empty()
        && rest.split('/').all(|element| {
            let mut chars = element.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(GraphError::InvalidPath(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_helpers() {
        assert_eq!(child_path("/", "Materials"), "/Materials");
        assert_eq!(child_path("/Materials", "Wood"), "/Materials/Wood");
        assert_eq!(parent_path("/Materials/Wood"), Some("/Materials"));
        assert_eq!(parent_path("/Materials"), Some("/"));
        assert_eq!(parent_path("/"), None);
        assert_eq!(prim_name("/Materials/Wood"), "Wood");
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("/Materials/Wood_01").is_ok());
        assert!(validate_path("Materials").is_err());
        assert!(validate_path("/").is_err());
        assert!(validate_path("/Materials/01").is_err());
        assert!(validate_path("/Materials//Wood").is_err());
    }

    #[test]
    fn test_define_creates_scopes() {
        let mut net = ShadingNetwork::new();
        net.define("/Root/Materials/Wood", PrimKind::Material).unwrap();
        assert_eq!(net.get("/Root").unwrap().kind, PrimKind::Scope);
        assert_eq!(net.get("/Root/Materials").unwrap().kind, PrimKind::Scope);
        assert_eq!(net.get("/Root/Materials/Wood").unwrap().kind, PrimKind::Material);
        assert_eq!(net.children("/Root").count(), 1);

        // Defining again returns the existing prim.
        net.define("/Root/Materials/Wood", PrimKind::Material).unwrap();
        assert_eq!(net.len(), 3);
    }

    #[test]
    fn test_uniquify_child() {
        let mut net = ShadingNetwork::new();
        assert_eq!(net.uniquify_child("/Materials", "wood grain"), "/Materials/wood_grain");
        net.define("/Materials/wood_grain", PrimKind::NodeGraph).unwrap();
        assert_eq!(net.uniquify_child("/Materials", "wood grain"), "/Materials/wood_grain_1");
        net.define("/Materials/wood_grain_1", PrimKind::NodeGraph).unwrap();
        assert_eq!(net.uniquify_child("/Materials", "wood grain"), "/Materials/wood_grain_2");
    }

    #[test]
    fn test_inputs_and_connections() {
        let mut prim = Prim::new("/M/Shader", PrimKind::Shader);
        prim.set_input("roughness", ValueType::Float, AttrValue::Float(0.5));
        prim.connect_input(
            "diffuseColor",
            ValueType::Color3f,
            Connection::output("/M/wood", "rgb"),
        );
        assert_eq!(prim.input_value("roughness").and_then(AttrValue::as_f64), Some(0.5));
        let conn = prim.input_connection("diffuseColor").unwrap();
        assert!(conn.is_output());
        assert_eq!(conn.base_name(), "rgb");
        assert_eq!(Connection::input("/G", "frame:st").base_name(), "frame:st");
    }

    #[test]
    fn test_network_json_roundtrip() {
        let mut net = ShadingNetwork::new();
        let prim = net.define("/Materials/M/Shader", PrimKind::Shader).unwrap();
        prim.shader_id = Some("UsdPreviewSurface".into());
        prim.set_input("opacity", ValueType::Float, AttrValue::Float(0.25));

        let json = serde_json::to_string(&net).unwrap();
        let back: ShadingNetwork = serde_json::from_str(&json).unwrap();
        assert_eq!(back, net);
    }
}
