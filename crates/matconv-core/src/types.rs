//! Material definition type tags and domains.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The representation a material lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// USD shading networks.
    Usd,
    /// The host application's native materials.
    Max,
    /// Any other domain named by a data file.
    Other(String),
}

impl Domain {
    pub fn parse(s: &str) -> Self {
        match s {
            "usd" => Domain::Usd,
            "3dsmax" => Domain::Max,
            other => Domain::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Domain::Usd => "usd",
            Domain::Max => "3dsmax",
            Domain::Other(s) => s,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type tag of a material definition input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Float,
    Int,
    Boolean,
    Color,
    TextureMap,
    NormalMap,
    /// Boolean "map enabled" flag paired with a texture slot.
    UseMap,
    Color3f,
    Float3,
    Normal3f,
    /// Unrecognized tag, kept verbatim.
    Other(String),
}

impl TypeTag {
    pub fn parse(s: &str) -> Self {
        match s {
            "float" => TypeTag::Float,
            "int" => TypeTag::Int,
            "boolean" | "bool" => TypeTag::Boolean,
            "color" => TypeTag::Color,
            "texturemap" => TypeTag::TextureMap,
            "normalmap" => TypeTag::NormalMap,
            "use_map" => TypeTag::UseMap,
            "color3f" => TypeTag::Color3f,
            "float3" => TypeTag::Float3,
            "normal3f" => TypeTag::Normal3f,
            other => TypeTag::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TypeTag::Float => "float",
            TypeTag::Int => "int",
            TypeTag::Boolean => "boolean",
            TypeTag::Color => "color",
            TypeTag::TextureMap => "texturemap",
            TypeTag::NormalMap => "normalmap",
            TypeTag::UseMap => "use_map",
            TypeTag::Color3f => "color3f",
            TypeTag::Float3 => "float3",
            TypeTag::Normal3f => "normal3f",
            TypeTag::Other(s) => s,
        }
    }

    /// Whether inputs of this type hold a texture connection.
    pub fn is_texture_slot(&self) -> bool {
        matches!(self, TypeTag::TextureMap | TypeTag::NormalMap)
    }

    /// Whether a three-component literal for this type is a color.
    pub fn is_color(&self) -> bool {
        matches!(self, TypeTag::Color | TypeTag::Color3f)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
