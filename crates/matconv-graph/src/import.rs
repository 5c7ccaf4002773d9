//! Import direction: shading network shaders to native material tables.
//!
//! [`NetworkShader`] exposes a shader of a network through
//! [`PropertyReadable`], so the mapper reads it exactly like a host
//! material. Connected inputs come back as texture references carrying the
//! `st` chain's transform and primvar. [`ImportBuilder`] then turns a
//! resolved mapping into a [`NativeMaterial`], creating native texture nodes
//! once per network texture.

use indexmap::IndexMap;
use matconv_core::{
    Diagnostics, OutputChannel, PropertyReadable, SourcePlacement, Transform2dParams,
    TextureReference, TypeTag, UberBitmapPlacement, Value, WrapMode,
};
use matconv_mapper::ResolvedMapping;
use matconv_recipe::ConversionRecipe;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::export::{TRANSFORM_2D_ID, UV_TEXTURE_ID};
use crate::network::{Attribute, AttrValue, Connection, Prim, PrimKind, ShadingNetwork, ValueType};
use crate::paths;
use crate::udim;

pub const BITMAP_TEXTURE_ID: &str = "Bitmaptexture";
pub const OSL_MAP_ID: &str = "OSLMap";
pub const UBERBITMAP_OSL: &str = "UberBitmap2.osl";
pub const OSLBITMAP_OSL: &str = "OSLBitmap2.osl";
pub const POSITION_MAP_OSL: &str = "GetUVW.osl";

/// OSL bitmap shaders the importer can drive, compared case-insensitively.
pub const SUPPORTED_OSL: [&str; 4] = [
    "uberbitmap.osl",
    "oslbitmap.osl",
    "uberbitmap2.osl",
    "oslbitmap2.osl",
];

/// Output index of each UberBitmap channel on a channel selector.
pub const UBERBITMAP_OUTPUTS: [(&str, u32); 5] =
    [("rgb", 1), ("r", 2), ("g", 3), ("b", 4), ("a", 5)];

const MAX_CONNECTION_DEPTH: usize = 16;

pub fn is_supported_osl(file_name: &str) -> bool {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    SUPPORTED_OSL
        .iter()
        .any(|s| s.eq_ignore_ascii_case(base))
}

/// A shader of a network read as a material.
pub struct NetworkShader<'a> {
    network: &'a ShadingNetwork,
    prim: &'a Prim,
}

impl<'a> NetworkShader<'a> {
    pub fn new(network: &'a ShadingNetwork, path: &str) -> Result<Self, matconv_core::GraphError> {
        let prim = network.prim(path)?;
        Ok(Self { network, prim })
    }

    pub fn prim(&self) -> &Prim {
        self.prim
    }

    /// The texture feeding a connected input, if it resolves to a
    /// `UsdUVTexture` output.
    pub fn texture(&self, param: &str) -> Option<TextureReference> {
        let connection = self.prim.input_connection(param)?;
        let (shader, output) = value_producing_output(self.network, connection, 0)?;
        read_texture(self.network, shader, output)
    }
}

impl PropertyReadable for NetworkShader<'_> {
    fn class_id(&self) -> &str {
        self.prim.shader_id.as_deref().unwrap_or("")
    }

    fn name(&self) -> &str {
        self.prim.name()
    }

    fn get(&self, param: &str) -> Option<Value> {
        let attr = self.prim.input(param)?;
        if attr.connection.is_some() {
            return self.texture(param).map(Value::texture);
        }
        attribute_value(attr)
    }
}

fn attribute_value(attr: &Attribute) -> Option<Value> {
    let value = attr.value.as_ref()?;
    Some(match value {
        AttrValue::Float(f) => Value::Float(*f),
        AttrValue::Int(i) => Value::Int(*i),
        AttrValue::Float2(v) => Value::Vector2(*v),
        AttrValue::Float3([r, g, b]) if attr.value_type == ValueType::Color3f => {
            Value::Color(matconv_core::Color::rgb(*r, *g, *b))
        }
        AttrValue::Float3(v) => Value::Vector3(*v),
        AttrValue::Token(s) | AttrValue::String(s) | AttrValue::Asset(s) => Value::String(s.clone()),
        AttrValue::Float4(_) => return None,
    })
}

/// Follow a connection through node graph outputs (and the graphs those
/// reference) down to the shader output producing the value.
fn value_producing_output<'n>(
    network: &'n ShadingNetwork,
    connection: &'n Connection,
    depth: usize,
) -> Option<(&'n Prim, &'n str)> {
    if depth > MAX_CONNECTION_DEPTH {
        log::warn!(
            "Connection chain too deep at {}.{}",
            connection.prim,
            connection.attribute
        );
        return None;
    }
    let prim = network.get(&connection.prim)?;
    if !connection.is_output() {
        return None;
    }
    let name = connection.base_name();
    match prim.kind {
        PrimKind::Shader => Some((prim, name)),
        PrimKind::NodeGraph => {
            if let Some(next) = prim.outputs.get(name).and_then(|a| a.connection.as_ref()) {
                return value_producing_output(network, next, depth + 1);
            }
            prim.references.iter().find_map(|target| {
                let referenced = network.get(target)?;
                let next = referenced.outputs.get(name)?.connection.as_ref()?;
                value_producing_output(network, next, depth + 1)
            })
        }
        _ => None,
    }
}

fn read_texture(network: &ShadingNetwork, shader: &Prim, output: &str) -> Option<TextureReference> {
    if shader.shader_id.as_deref() != Some(UV_TEXTURE_ID) {
        log::warn!("Unsupported shading connection: {}.outputs:{}", shader.path, output);
        return None;
    }

    let token = |name: &str| {
        shader
            .input_value(name)
            .and_then(AttrValue::as_str)
            .map(str::to_string)
    };
    let mut params = Transform2dParams {
        wrap_s: token("wrapS"),
        wrap_t: token("wrapT"),
        ..Default::default()
    };
    let primvar = read_st_chain(network, shader, &mut params);
    if primvar.is_none() {
        log::error!("Unable to determine primvar input for: {}", shader.path);
    }

    Some(TextureReference {
        identity: shader.path.clone(),
        name: shader.name().to_string(),
        file_path: token("file"),
        output: OutputChannel::Name(output.to_string()),
        map_channel: None,
        primvar,
        placement: SourcePlacement::Transform2d(params),
        linear: token("sourceColorSpace").as_deref() == Some("raw"),
        via_normal_bump: false,
    })
}

/// Walk `st` back through an optional `UsdTransform2d` to the primvar
/// reader, collecting transform values on the way. Returns the primvar name.
fn read_st_chain(
    network: &ShadingNetwork,
    texture: &Prim,
    params: &mut Transform2dParams,
) -> Option<String> {
    let mut source = network.get(&texture.input_connection("st")?.prim)?;

    if source.shader_id.as_deref() == Some(TRANSFORM_2D_ID) {
        params.scale = source.input_value("scale").and_then(AttrValue::as_float2);
        params.rotation = source.input_value("rotation").and_then(AttrValue::as_f64);
        params.translation = source
            .input_value("translation")
            .and_then(AttrValue::as_float2);
        source = network.get(&source.input_connection("in")?.prim)?;
    }

    if !source
        .shader_id
        .as_deref()
        .is_some_and(|id| id.starts_with("UsdPrimvarReader"))
    {
        return None;
    }
    read_string_input(network, source, "varname", 0)
}

/// A string input's value, following connections to graph inputs.
fn read_string_input(network: &ShadingNetwork, prim: &Prim, name: &str, depth: usize) -> Option<String> {
    if depth > MAX_CONNECTION_DEPTH {
        return None;
    }
    let attr = prim.input(name)?;
    if let Some(connection) = &attr.connection {
        let source = network.get(&connection.prim)?;
        return read_string_input(network, source, connection.base_name(), depth + 1);
    }
    attr.value.as_ref()?.as_str().map(str::to_string)
}

/// UberBitmap parameters reproducing a network texture's placement.
pub fn import_texture_placement(
    texture: &TextureReference,
    diagnostics: &mut Diagnostics,
) -> UberBitmapPlacement {
    match &texture.placement {
        SourcePlacement::Transform2d(params) => {
            matconv_uv::uberbitmap_from_transform2d(params, &texture.name, diagnostics)
        }
        SourcePlacement::UberBitmap(placement) => placement.clone(),
        _ => UberBitmapPlacement::default(),
    }
}

/// Settings the import builder needs from the import options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// `Bitmaptexture` or the file name of a supported OSL bitmap shader.
    pub texture_target_id: String,
    /// Primvar name to map channel, checked before the `st`/`stN` rule.
    pub primvar_channels: IndexMap<String, u32>,
    /// Directory relative texture paths are resolved against.
    pub layer_dir: Option<PathBuf>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            texture_target_id: BITMAP_TEXTURE_ID.to_string(),
            primvar_channels: IndexMap::new(),
            layer_dir: None,
        }
    }
}

impl ImportSettings {
    /// Map channel read by a primvar: the explicit table, else `st` is
    /// channel 1 and `stN` channel N+1.
    pub fn channel_for_primvar(&self, primvar: &str) -> Option<u32> {
        if let Some(channel) = self.primvar_channels.get(primvar) {
            return Some(*channel);
        }
        let suffix = primvar.strip_prefix("st")?;
        if suffix.is_empty() {
            return Some(1);
        }
        suffix.parse::<u32>().ok().map(|n| n + 1)
    }
}

/// A native texture node to create on the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeTexture {
    pub name: String,
    pub class_id: String,
    /// Shader file of an OSL texture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osl_file: Option<String>,
    pub properties: IndexMap<String, Value>,
    /// UVW source feeding an OSL bitmap's `Pos_map`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_map: Option<Box<NativeTexture>>,
}

impl NativeTexture {
    fn new(name: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_id: class_id.into(),
            osl_file: None,
            properties: IndexMap::new(),
            position_map: None,
        }
    }

    pub fn is_osl(&self) -> bool {
        self.class_id == OSL_MAP_ID
    }
}

/// Selects one output of a multi-output texture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSelector {
    pub name: String,
    pub output_index: u32,
}

/// A texture slot assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureSlot {
    /// Name of the native texture.
    pub texture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<ChannelSelector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeProperty {
    Value(Value),
    Texture(TextureSlot),
}

/// A native material: class id plus parameter assignments in mapping order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeMaterial {
    pub class_id: String,
    pub name: String,
    pub properties: IndexMap<String, NativeProperty>,
}

impl NativeMaterial {
    pub fn get(&self, param: &str) -> Option<&NativeProperty> {
        self.properties.get(param)
    }

    pub fn value(&self, param: &str) -> Option<&Value> {
        match self.properties.get(param)? {
            NativeProperty::Value(v) => Some(v),
            NativeProperty::Texture(_) => None,
        }
    }

    pub fn texture_slot(&self, param: &str) -> Option<&TextureSlot> {
        match self.properties.get(param)? {
            NativeProperty::Texture(slot) => Some(slot),
            NativeProperty::Value(_) => None,
        }
    }
}

/// Native textures created in one import session, by network texture path.
#[derive(Debug, Default)]
pub struct NativeTextureCache {
    textures: IndexMap<String, NativeTexture>,
}

impl NativeTextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &str) -> Option<&NativeTexture> {
        self.textures.get(identity)
    }

    pub fn textures(&self) -> impl Iterator<Item = &NativeTexture> {
        self.textures.values()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub material: NativeMaterial,
    pub diagnostics: Diagnostics,
}

/// Builds native materials from resolved mappings.
pub struct ImportBuilder<'a> {
    settings: &'a ImportSettings,
}

impl<'a> ImportBuilder<'a> {
    pub fn new(settings: &'a ImportSettings) -> Self {
        Self { settings }
    }

    /// Assign every resolved value of `resolved` onto a new native material
    /// of the recipe's target type.
    pub fn build(
        &self,
        name: &str,
        resolved: &ResolvedMapping,
        recipe: &ConversionRecipe,
        cache: &mut NativeTextureCache,
    ) -> ImportReport {
        let mut diagnostics = Diagnostics::new();
        let mut material = NativeMaterial {
            class_id: recipe.target.id.clone(),
            name: name.to_string(),
            properties: IndexMap::new(),
        };

        for (param, value) in resolved.assigned() {
            let Some(tag) = recipe.target_input_type(param) else {
                diagnostics.error(format!(
                    "Parameter \"{}\" is not defined on {}",
                    param, recipe.target.id
                ));
                continue;
            };

            let property = match (tag, value) {
                (TypeTag::UseMap, Value::Texture(_)) => Some(NativeProperty::Value(Value::Bool(true))),
                (TypeTag::UseMap, Value::Bool(b)) => Some(NativeProperty::Value(Value::Bool(*b))),
                (TypeTag::UseMap, _) => None,
                (tag, Value::Texture(texture)) if tag.is_texture_slot() => self
                    .texture_slot(texture, cache, &mut diagnostics)
                    .map(NativeProperty::Texture),
                // A value parameter fed by the same network input as its map.
                (tag, _) if tag.is_texture_slot() => None,
                (_, Value::Texture(_)) => None,
                (TypeTag::Color, Value::Color(_)) => Some(NativeProperty::Value(value.clone())),
                (TypeTag::Color, other) => {
                    diagnostics.warn(format!(
                        "Unsupported {} value for color parameter {}.{}",
                        other.type_name(),
                        name,
                        param
                    ));
                    None
                }
                (TypeTag::Float | TypeTag::Int | TypeTag::Boolean, _) => {
                    Some(NativeProperty::Value(value.clone()))
                }
                (other, _) => {
                    diagnostics.warn(format!(
                        "Unsupported parameter type \"{}\" for {}.{}",
                        other, name, param
                    ));
                    None
                }
            };

            if let Some(property) = property {
                material.properties.insert(param.to_string(), property);
            }
        }

        ImportReport {
            material,
            diagnostics,
        }
    }

    fn texture_slot(
        &self,
        texture: &TextureReference,
        cache: &mut NativeTextureCache,
        diagnostics: &mut Diagnostics,
    ) -> Option<TextureSlot> {
        let target_id = self.settings.texture_target_id.as_str();
        let is_osl = target_id.to_ascii_lowercase().ends_with(".osl");
        if !is_osl && target_id != BITMAP_TEXTURE_ID {
            diagnostics.warn(format!("Invalid texture type specified: {}", target_id));
            return None;
        }

        if !cache.textures.contains_key(&texture.identity) {
            let native = if is_osl {
                self.osl_texture(texture, target_id, diagnostics)
            } else {
                self.bitmap_texture(texture, diagnostics)
            };
            cache.textures.insert(texture.identity.clone(), native);
        }
        let native = cache.textures.get(&texture.identity)?;

        let selector = native.is_osl().then(|| {
            let channel = match &texture.output {
                OutputChannel::Name(name) => name.clone(),
                OutputChannel::Index(index) => UBERBITMAP_OUTPUTS
                    .iter()
                    .find(|(_, i)| i == index)
                    .map_or_else(|| "rgb".to_string(), |(n, _)| n.to_string()),
                OutputChannel::Default => "rgb".to_string(),
            };
            let output_index = UBERBITMAP_OUTPUTS
                .iter()
                .find(|(n, _)| *n == channel)
                .map_or(1, |(_, i)| *i);
            ChannelSelector {
                name: format!("{}:{}", native.name, channel),
                output_index,
            }
        });

        Some(TextureSlot {
            texture: native.name.clone(),
            selector,
        })
    }

    fn map_channel(&self, texture: &TextureReference, diagnostics: &mut Diagnostics) -> u32 {
        let Some(primvar) = texture.primvar.as_deref() else {
            diagnostics.error(format!(
                "Unable to determine primvar input for: {}",
                texture.identity
            ));
            return 1;
        };
        self.settings.channel_for_primvar(primvar).unwrap_or_else(|| {
            diagnostics.error(format!(
                "Channel is not mapped for primvar name: {} for {}. Using fallback channel 1.",
                primvar, texture.identity
            ));
            1
        })
    }

    fn file_path(&self, texture: &TextureReference) -> Option<String> {
        let file = texture.file_path.as_deref().filter(|f| !f.is_empty())?;
        match &self.settings.layer_dir {
            Some(dir) if !paths::is_absolute(file) => {
                Some(paths::resolve_against(&dir.to_string_lossy(), file))
            }
            _ => Some(paths::to_posix(file)),
        }
    }

    fn bitmap_texture(&self, texture: &TextureReference, diagnostics: &mut Diagnostics) -> NativeTexture {
        let mut native = NativeTexture::new(&texture.name, BITMAP_TEXTURE_ID);
        if let Some(file) = self.file_path(texture) {
            native.properties.insert("filename".into(), Value::String(file));
        }
        let channel = self.map_channel(texture, diagnostics);
        native
            .properties
            .insert("mapChannel".into(), Value::Int(i64::from(channel)));

        if let SourcePlacement::Transform2d(params) = &texture.placement {
            let wrap = |token: Option<&str>| token.and_then(WrapMode::from_token).unwrap_or(WrapMode::Repeat);
            let (u_tile, u_mirror) =
                matconv_uv::bitmap_wrap_flags(wrap(params.wrap_s.as_deref()), diagnostics);
            let (v_tile, v_mirror) =
                matconv_uv::bitmap_wrap_flags(wrap(params.wrap_t.as_deref()), diagnostics);
            native.properties.insert("U_Tile".into(), Value::Bool(u_tile));
            native.properties.insert("U_Mirror".into(), Value::Bool(u_mirror));
            native.properties.insert("V_Tile".into(), Value::Bool(v_tile));
            native.properties.insert("V_Mirror".into(), Value::Bool(v_mirror));
        }
        native
    }

    fn osl_texture(
        &self,
        texture: &TextureReference,
        target_id: &str,
        diagnostics: &mut Diagnostics,
    ) -> NativeTexture {
        let osl_file = if is_supported_osl(target_id) {
            target_id.to_string()
        } else {
            diagnostics.error(format!(
                "Unsupported OSL type specified, using {} instead: {}",
                UBERBITMAP_OSL, target_id
            ));
            UBERBITMAP_OSL.to_string()
        };

        let mut native = NativeTexture::new(&texture.name, OSL_MAP_ID);
        native.osl_file = Some(osl_file.clone());

        if let Some(file) = self.file_path(texture) {
            if udim::is_udim_path(&file) {
                self.set_udim_files(&mut native, &file, diagnostics);
            } else {
                native.properties.insert("filename".into(), Value::String(file));
            }
        }

        let channel = i64::from(self.map_channel(texture, diagnostics));
        let lower = osl_file.to_ascii_lowercase();
        if lower.starts_with("uberbitmap") {
            native.properties.insert("UVSet".into(), Value::Int(channel));
            let placement = import_texture_placement(texture, diagnostics);
            let props = &mut native.properties;
            props.insert("WrapMode".into(), Value::String(placement.wrap_mode.as_str().into()));
            props.insert("offset".into(), Value::Vector3(placement.offset));
            props.insert("rotate".into(), Value::Float(placement.rotate));
            props.insert("RotAxis".into(), Value::Vector3(placement.rot_axis));
            props.insert("RotCenter".into(), Value::Vector3(placement.rot_center));
            props.insert("scale".into(), Value::Float(placement.scale));
            props.insert("tiling".into(), Value::Vector3(placement.tiling));
        } else if lower.starts_with("oslbitmap") {
            let mut position = NativeTexture::new(format!("{}_uvw", texture.name), OSL_MAP_ID);
            position.osl_file = Some(POSITION_MAP_OSL.to_string());
            position.properties.insert("UVSet".into(), Value::Int(channel));
            native.position_map = Some(Box::new(position));
        }
        native
    }

    fn set_udim_files(&self, native: &mut NativeTexture, file: &str, diagnostics: &mut Diagnostics) {
        let dir = paths::parent_dir(file).unwrap_or_else(|| ".".to_string());
        let pattern = file.rsplit('/').next().unwrap_or(file);
        let tiles = match udim::first_valid_udim(Path::new(&dir), pattern) {
            Ok(Some(_)) => udim::all_valid_udims(Path::new(&dir), pattern).unwrap_or_default(),
            _ => Vec::new(),
        };
        if tiles.is_empty() {
            diagnostics.error(format!(
                "UDIM format specified in imported file but no UDIM valid files found at specified directory: {}",
                file
            ));
            return;
        }

        let names: Vec<String> = tiles
            .iter()
            .map(|tile| udim::tile_file_name(pattern, *tile))
            .collect();
        let props = &mut native.properties;
        props.insert("filename".into(), Value::String(file.to_string()));
        props.insert("UDIM".into(), Value::Int(1));
        props.insert("loadUDIM".into(), Value::String(file.to_string()));
        props.insert("Filename_UDIMList".into(), Value::String(names.join(" ")));
    }
}
