//! Texture placement parameters and the decomposed 2D transform.
//!
//! Placement structs mirror the parameter blocks of the texture nodes a
//! source material can reference. Field defaults follow the node defaults
//! of the host application, so a partially specified JSON block behaves like
//! a freshly created node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wrap token of a `UsdUVTexture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    #[default]
    Repeat,
    Mirror,
    Clamp,
    Black,
}

impl WrapMode {
    pub fn as_token(&self) -> &'static str {
        match self {
            WrapMode::Repeat => "repeat",
            WrapMode::Mirror => "mirror",
            WrapMode::Clamp => "clamp",
            WrapMode::Black => "black",
        }
    }

    /// Parse a target wrap token. `useMetadata` is not a concrete mode and
    /// yields `None` like any other unknown token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "repeat" => Some(WrapMode::Repeat),
            "mirror" => Some(WrapMode::Mirror),
            "clamp" => Some(WrapMode::Clamp),
            "black" => Some(WrapMode::Black),
            _ => None,
        }
    }
}

impl fmt::Display for WrapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// `WrapMode` parameter of the OSL bitmap shaders. One mode drives both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProceduralWrapMode {
    #[default]
    #[serde(rename = "periodic")]
    Periodic,
    #[serde(rename = "mirror")]
    Mirror,
    #[serde(rename = "clamp")]
    Clamp,
    #[serde(rename = "black")]
    Black,
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "useMetadata")]
    UseMetadata,
}

impl ProceduralWrapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProceduralWrapMode::Periodic => "periodic",
            ProceduralWrapMode::Mirror => "mirror",
            ProceduralWrapMode::Clamp => "clamp",
            ProceduralWrapMode::Black => "black",
            ProceduralWrapMode::Default => "default",
            ProceduralWrapMode::UseMetadata => "useMetadata",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "periodic" | "repeat" => Some(ProceduralWrapMode::Periodic),
            "mirror" => Some(ProceduralWrapMode::Mirror),
            "clamp" => Some(ProceduralWrapMode::Clamp),
            "black" => Some(ProceduralWrapMode::Black),
            "default" => Some(ProceduralWrapMode::Default),
            "useMetadata" => Some(ProceduralWrapMode::UseMetadata),
            _ => None,
        }
    }
}

/// Coordinate block of a classic bitmap texture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UvwCoordinates {
    pub u_offset: f64,
    pub v_offset: f64,
    pub u_tiling: f64,
    pub v_tiling: f64,
    /// Rotation angles in degrees.
    pub u_angle: f64,
    pub v_angle: f64,
    pub w_angle: f64,
    pub u_tile: bool,
    pub v_tile: bool,
    pub u_mirror: bool,
    pub v_mirror: bool,
    pub real_world_scale: bool,
    pub real_world_width: f64,
    pub real_world_height: f64,
    /// 0 is "Texture"; other mapping types cannot be exported.
    pub mapping_type: u32,
    /// 0 is explicit map channel, 1 is vertex color channel.
    pub mapping: u32,
    pub map_channel: u32,
}

impl Default for UvwCoordinates {
    fn default() -> Self {
        Self {
            u_offset: 0.0,
            v_offset: 0.0,
            u_tiling: 1.0,
            v_tiling: 1.0,
            u_angle: 0.0,
            v_angle: 0.0,
            w_angle: 0.0,
            u_tile: true,
            v_tile: true,
            u_mirror: false,
            v_mirror: false,
            real_world_scale: false,
            real_world_width: 1.0,
            real_world_height: 1.0,
            mapping_type: 0,
            mapping: 0,
            map_channel: 1,
        }
    }
}

impl UvwCoordinates {
    pub fn with_tiling(mut self, u: f64, v: f64) -> Self {
        self.u_tiling = u;
        self.v_tiling = v;
        self
    }

    pub fn with_offset(mut self, u: f64, v: f64) -> Self {
        self.u_offset = u;
        self.v_offset = v;
        self
    }

    pub fn with_angles(mut self, u: f64, v: f64, w: f64) -> Self {
        self.u_angle = u;
        self.v_angle = v;
        self.w_angle = w;
        self
    }

    pub fn with_real_world_size(mut self, width: f64, height: f64) -> Self {
        self.real_world_scale = true;
        self.real_world_width = width;
        self.real_world_height = height;
        self
    }
}

/// Parameters of the OSL UberBitmap shader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UberBitmapPlacement {
    pub tiling: [f64; 3],
    pub offset: [f64; 3],
    pub scale: f64,
    /// Rotation in degrees around `rot_axis`.
    pub rotate: f64,
    pub rot_axis: [f64; 3],
    pub rot_center: [f64; 3],
    pub real_world: bool,
    pub real_width: f64,
    pub real_height: f64,
    pub wrap_mode: ProceduralWrapMode,
    pub uv_set: u32,
    /// Inputs driven by a connected sub-map rather than a static value.
    pub driven_inputs: Vec<String>,
}

impl Default for UberBitmapPlacement {
    fn default() -> Self {
        Self {
            tiling: [1.0, 1.0, 1.0],
            offset: [0.0, 0.0, 0.0],
            scale: 1.0,
            rotate: 0.0,
            rot_axis: [0.0, 0.0, 1.0],
            rot_center: [0.5, 0.5, 0.0],
            real_world: false,
            real_width: 1.0,
            real_height: 1.0,
            wrap_mode: ProceduralWrapMode::Periodic,
            uv_set: 1,
            driven_inputs: Vec::new(),
        }
    }
}

/// Parameters of the simple OSL bitmap shader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OslBitmapPlacement {
    pub scale: f64,
    pub wrap_mode: ProceduralWrapMode,
    pub uv_set: u32,
    pub driven_inputs: Vec<String>,
}

impl Default for OslBitmapPlacement {
    fn default() -> Self {
        Self {
            scale: 1.0,
            wrap_mode: ProceduralWrapMode::Periodic,
            uv_set: 1,
            driven_inputs: Vec::new(),
        }
    }
}

/// Raw values read back from a `UsdUVTexture` and its optional
/// `UsdTransform2d`. Absent inputs stay `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform2dParams {
    pub scale: Option<[f64; 2]>,
    pub rotation: Option<f64>,
    pub translation: Option<[f64; 2]>,
    pub wrap_s: Option<String>,
    pub wrap_t: Option<String>,
}

/// Placement of a texture in its own parameter space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePlacement {
    /// No placement information (unsupported texture kind).
    #[default]
    None,
    Bitmap(UvwCoordinates),
    UberBitmap(UberBitmapPlacement),
    OslBitmap(OslBitmapPlacement),
    Transform2d(Transform2dParams),
}

/// Decomposed texture transform in the `UsdTransform2d` parameter space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextureTransform2D {
    pub scale: [f64; 2],
    pub rotation_degrees: f64,
    pub translation: [f64; 2],
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

impl Default for TextureTransform2D {
    fn default() -> Self {
        Self {
            scale: [1.0, 1.0],
            rotation_degrees: 0.0,
            translation: [0.0, 0.0],
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
        }
    }
}

impl TextureTransform2D {
    pub fn has_scale(&self) -> bool {
        self.scale != [1.0, 1.0]
    }

    pub fn has_rotation(&self) -> bool {
        self.rotation_degrees != 0.0
    }

    pub fn has_translation(&self) -> bool {
        self.translation != [0.0, 0.0]
    }

    /// True when no `UsdTransform2d` node is needed.
    pub fn is_identity(&self) -> bool {
        !self.has_scale() && !self.has_rotation() && !self.has_translation()
    }
}
