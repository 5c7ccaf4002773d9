//! Parameter values read from and written to materials.

use crate::placement::SourcePlacement;
use serde::{Deserialize, Serialize};

/// Linear RGB color with components in 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Rec. 709 luminance, used when a color feeds a scalar input.
    pub fn luminance(&self) -> f64 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::rgb(self.r * factor, self.g * factor, self.b * factor)
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

/// Which output of a texture node a parameter consumes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputChannel {
    /// The full color output.
    #[default]
    Default,
    /// Output index of a multi-output channel selector (1 = rgb .. 5 = a).
    Index(u32),
    /// An explicit output name.
    Name(String),
}

/// A texture-valued property of a source material.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureReference {
    /// Stable identity used to reuse nodes built for the same texture.
    pub identity: String,
    pub name: String,
    /// Resolved file path, if the texture reads a file.
    pub file_path: Option<String>,
    pub output: OutputChannel,
    /// Host map channel feeding the texture's UVs.
    pub map_channel: Option<u32>,
    /// Primvar name when the texture comes from a shading network.
    pub primvar: Option<String>,
    pub placement: SourcePlacement,
    /// Gamma 1.0 textures are read as raw data.
    pub linear: bool,
    /// The texture reached the material through a normal-bump wrapper.
    pub via_normal_bump: bool,
}

impl TextureReference {
    pub fn new(identity: impl Into<String>, file_path: impl Into<String>) -> Self {
        let identity = identity.into();
        Self {
            name: identity.clone(),
            identity,
            file_path: Some(file_path.into()),
            ..Default::default()
        }
    }

    pub fn with_placement(mut self, placement: SourcePlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_output(mut self, output: OutputChannel) -> Self {
        self.output = output;
        self
    }

    pub fn with_map_channel(mut self, channel: u32) -> Self {
        self.map_channel = Some(channel);
        self
    }

    pub fn linear(mut self) -> Self {
        self.linear = true;
        self
    }
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Color(Color),
    Vector2([f64; 2]),
    Vector3([f64; 3]),
    String(String),
    Texture(Box<TextureReference>),
}

impl Value {
    pub fn texture(texture: TextureReference) -> Self {
        Value::Texture(Box::new(texture))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Color(_) => "color",
            Value::Vector2(_) => "vector2",
            Value::Vector3(_) => "vector3",
            Value::String(_) => "string",
            Value::Texture(_) => "texture",
        }
    }

    /// Truthiness as the data files assume it: zero, false and empty strings
    /// are false; colors, vectors and textures are always true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Color(_) | Value::Vector2(_) | Value::Vector3(_) | Value::Texture(_) => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<&TextureReference> {
        match self {
            Value::Texture(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_texture(&self) -> bool {
        matches!(self, Value::Texture(_))
    }

    /// `1 - value` for numeric values and colors.
    pub fn one_minus(&self) -> Option<Value> {
        match self {
            Value::Bool(b) => Some(Value::Int(1 - i64::from(*b))),
            Value::Int(i) => Some(
                1i64.checked_sub(*i)
                    .map_or(Value::Float(1.0 - *i as f64), Value::Int),
            ),
            Value::Float(f) => Some(Value::Float(1.0 - f)),
            Value::Color(c) => Some(Value::Color(Color::rgb(1.0 - c.r, 1.0 - c.g, 1.0 - c.b))),
            _ => None,
        }
    }

    /// `factor * value`. Integers stay integers when both sides are integral
    /// and the product fits, and become floats otherwise.
    pub fn multiplied_by(&self, factor: &Value) -> Option<Value> {
        match (factor, self) {
            (Value::Int(a), Value::Int(b)) => Some(
                a.checked_mul(*b)
                    .map_or(Value::Float(*a as f64 * *b as f64), Value::Int),
            ),
            (Value::Color(c), v) | (v, Value::Color(c)) => v.as_f64().map(|f| Value::Color(c.scaled(f))),
            (a, b) => Some(Value::Float(a.as_f64()? * b.as_f64()?)),
        }
    }

    /// The key a `case` block uses for this value.
    pub fn case_key(&self) -> String {
        match self {
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::String(s) => s.clone(),
            Value::Color(c) => format!("({:?}, {:?}, {:?})", c.r, c.g, c.b),
            Value::Vector2([x, y]) => format!("({:?}, {:?})", x, y),
            Value::Vector3([x, y, z]) => format!("({:?}, {:?}, {:?})", x, y, z),
            Value::Texture(t) => t.name.clone(),
        }
    }

    /// Convert a JSON literal from a recipe into a value. Three-element
    /// arrays become colors when `as_color` is set, vectors otherwise.
    pub fn from_json(json: &serde_json::Value, as_color: bool) -> Option<Value> {
        use serde_json::Value as Json;
        match json {
            Json::Bool(b) => Some(Value::Bool(*b)),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Int(i)),
                None => n.as_f64().map(Value::Float),
            },
            Json::String(s) => Some(Value::String(s.clone())),
            Json::Array(items) => {
                let nums: Option<Vec<f64>> = items.iter().map(|v| v.as_f64()).collect();
                match nums?.as_slice() {
                    [x, y] => Some(Value::Vector2([*x, *y])),
                    [r, g, b] if as_color => Some(Value::Color(Color::rgb(*r, *g, *b))),
                    [x, y, z] => Some(Value::Vector3([*x, *y, *z])),
                    _ => None,
                }
            }
            Json::Null | Json::Object(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Case key for a possibly missing value.
pub fn case_key(value: Option<&Value>) -> String {
    value.map(Value::case_key).unwrap_or_else(|| "None".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_keys() {
        assert_eq!(case_key(Some(&Value::Bool(true))), "True");
        assert_eq!(case_key(Some(&Value::Bool(false))), "False");
        assert_eq!(case_key(Some(&Value::Int(2))), "2");
        assert_eq!(case_key(Some(&Value::Float(1.0))), "1.0");
        assert_eq!(case_key(Some(&Value::Float(0.5))), "0.5");
        assert_eq!(case_key(Some(&Value::from("metal"))), "metal");
        assert_eq!(case_key(None), "None");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Float(0.0).is_truthy());
        assert!(Value::Float(0.1).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::Color(Color::default()).is_truthy());
        assert!(Value::texture(TextureReference::new("tex", "a.png")).is_truthy());
    }

    #[test]
    fn test_one_minus_and_multiply() {
        match Value::Float(0.333).one_minus() {
            Some(Value::Float(f)) => assert!((f - 0.667).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(Value::Int(1).one_minus(), Some(Value::Int(0)));
        assert_eq!(Value::Int(3).multiplied_by(&Value::Int(2)), Some(Value::Int(6)));
        assert_eq!(
            Value::Float(0.5).multiplied_by(&Value::Float(4.0)),
            Some(Value::Float(2.0))
        );
        assert_eq!(
            Value::Color(Color::rgb(1.0, 0.5, 0.0)).multiplied_by(&Value::Float(0.5)),
            Some(Value::Color(Color::rgb(0.5, 0.25, 0.0)))
        );
        assert_eq!(Value::from("x").one_minus(), None);
        assert_eq!(Value::from("x").multiplied_by(&Value::Float(2.0)), None);
    }

    #[test]
    fn test_integer_overflow_becomes_float() {
        assert_eq!(
            Value::Int(i64::MAX).multiplied_by(&Value::Int(2)),
            Some(Value::Float(i64::MAX as f64 * 2.0))
        );
        assert_eq!(
            Value::Int(i64::MIN).one_minus(),
            Some(Value::Float(1.0 - i64::MIN as f64))
        );
        assert_eq!(Value::Int(i64::MIN + 2).one_minus(), Some(Value::Int(i64::MAX)));
    }

    #[test]
    fn test_luminance() {
        let c = Color::rgb(1.0, 1.0, 1.0);
        assert!((c.luminance() - 1.0).abs() < 1e-12);
        assert!((Color::rgb(0.0, 1.0, 0.0).luminance() - 0.7152).abs() < 1e-12);
    }

    #[test]
    fn test_from_json_literals() {
        let json: serde_json::Value = serde_json::json!([1.0, 0.5, 0.0]);
        assert_eq!(
            Value::from_json(&json, true),
            Some(Value::Color(Color::rgb(1.0, 0.5, 0.0)))
        );
        assert_eq!(Value::from_json(&json, false), Some(Value::Vector3([1.0, 0.5, 0.0])));
        assert_eq!(Value::from_json(&serde_json::json!(2), false), Some(Value::Int(2)));
        assert_eq!(Value::from_json(&serde_json::json!(0.25), false), Some(Value::Float(0.25)));
        assert_eq!(Value::from_json(&serde_json::json!(null), false), None);
    }

    #[test]
    fn test_value_json_shape() {
        let v: Value = serde_json::from_str(r#"{"float": 0.5}"#).unwrap();
        assert_eq!(v, Value::Float(0.5));
        let t: Value = serde_json::from_str(
            r#"{"texture": {"identity": "wood", "file_path": "wood.png", "output": {"index": 2}}}"#,
        )
        .unwrap();
        let tex = t.as_texture().unwrap();
        assert_eq!(tex.identity, "wood");
        assert_eq!(tex.output, OutputChannel::Index(2));
        assert_eq!(tex.placement, SourcePlacement::None);
    }
}
