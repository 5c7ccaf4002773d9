//! Export direction: resolved target parameters to a shading network.
//!
//! Each material gets a `Material` prim holding one shader of the recipe's
//! target type. Texture-valued parameters become shared `NodeGraph`s under
//! the materials root (one per source texture, reused across materials
//! through a [`TextureCache`]), each holding a `UsdUVTexture`, a primvar
//! reader and, when needed, a `UsdTransform2d`. A material never connects
//! across its own boundary: it gets a local `NodeGraph` referencing the
//! shared one and its shader inputs connect to that.

use indexmap::IndexMap;
use matconv_core::{
    Diagnostics, GraphError, OutputChannel, TextureReference, TextureTransform2D, TypeTag, Value,
};
use matconv_mapper::ResolvedMapping;
use matconv_recipe::ConversionRecipe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::network::{
    child_path, prim_name, validate_path, AttrValue, Connection, PrimKind, ShadingNetwork,
    ValueType,
};
use crate::paths;
use crate::usda::sanitize_name;

pub const UV_TEXTURE_ID: &str = "UsdUVTexture";
pub const PRIMVAR_READER_ID: &str = "UsdPrimvarReader_float2";
pub const TRANSFORM_2D_ID: &str = "UsdTransform2d";

/// Output names of a multi-output channel selector, by index.
const SELECTOR_OUTPUTS: [(u32, &str); 5] = [(1, "rgb"), (2, "r"), (3, "g"), (4, "b"), (5, "a")];

/// Settings the builder needs from the export options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Absolute path of the scope holding materials and shared textures.
    pub materials_root: String,
    /// Primvar name of map channel 1.
    pub st_primvar_name: String,
    /// Explicit map channel to primvar names, checked first.
    pub channel_primvars: IndexMap<u32, String>,
    pub relative_texture_paths: bool,
    /// Layer being written; relative texture paths are computed from its
    /// directory.
    pub layer_path: Option<PathBuf>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            materials_root: "/Materials".to_string(),
            st_primvar_name: "st".to_string(),
            channel_primvars: IndexMap::new(),
            relative_texture_paths: true,
            layer_path: None,
        }
    }
}

impl BuildSettings {
    /// Primvar read for a map channel: the explicit table, else `st` for
    /// channel 1 and `st<n-1>` for channel n. Channel 0 has no primvar.
    pub fn primvar_for_channel(&self, channel: u32) -> Option<String> {
        if let Some(name) = self.channel_primvars.get(&channel) {
            return Some(name.clone());
        }
        match channel {
            0 => None,
            1 => Some(self.st_primvar_name.clone()),
            n => Some(format!("{}{}", self.st_primvar_name, n - 1)),
        }
    }
}

/// Texture graphs already written in one export session, by texture
/// identity.
#[derive(Debug, Default)]
pub struct TextureCache {
    graphs: IndexMap<String, String>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the graph built for a texture identity.
    pub fn get(&self, identity: &str) -> Option<&str> {
        self.graphs.get(identity).map(String::as_str)
    }

    pub fn insert(&mut self, identity: impl Into<String>, graph_path: impl Into<String>) {
        self.graphs.insert(identity.into(), graph_path.into());
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn clear(&mut self) {
        self.graphs.clear();
    }
}

/// What one material build wrote.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub material_path: String,
    pub shader_path: String,
    /// Shader inputs authored with a value.
    pub authored: Vec<String>,
    /// Shader inputs connected to a texture.
    pub connected: Vec<String>,
    /// Shared texture graphs created by this build.
    pub new_graphs: Vec<String>,
    pub diagnostics: Diagnostics,
}

/// Writes materials into a shading network.
pub struct GraphBuilder<'a> {
    network: &'a mut ShadingNetwork,
    settings: &'a BuildSettings,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(network: &'a mut ShadingNetwork, settings: &'a BuildSettings) -> Self {
        Self { network, settings }
    }

    /// Write one material at `material_path` from its resolved parameters.
    ///
    /// Problems with single parameters are reported in the returned
    /// diagnostics and never abort the material.
    pub fn build(
        &mut self,
        material_path: &str,
        resolved: &ResolvedMapping,
        recipe: &ConversionRecipe,
        cache: &mut TextureCache,
    ) -> Result<BuildReport, GraphError> {
        validate_path(material_path)?;
        validate_path(&self.settings.materials_root)?;

        let shader_path = child_path(material_path, &sanitize_name(&recipe.target.id));
        let mut report = BuildReport {
            material_path: material_path.to_string(),
            shader_path: shader_path.clone(),
            ..Default::default()
        };

        self.network.define(material_path, PrimKind::Material)?;
        let shader = self.network.define(&shader_path, PrimKind::Shader)?;
        shader.shader_id = Some(recipe.target.id.clone());
        shader.create_output("surface", ValueType::Token);
        self.network.prim_mut(material_path)?.connect_output(
            "surface",
            ValueType::Token,
            Connection::output(shader_path.as_str(), "surface"),
        );

        for (param, tag) in &recipe.target.inputs {
            let Some(value) = resolved.get(param) else {
                continue;
            };
            match value {
                Value::Texture(texture) => {
                    self.connect_texture(param, tag, texture, recipe, cache, &mut report)?
                }
                other => self.author_value(param, tag, other, &mut report)?,
            }
        }

        Ok(report)
    }

    fn author_value(
        &mut self,
        param: &str,
        tag: &TypeTag,
        value: &Value,
        report: &mut BuildReport,
    ) -> Result<(), GraphError> {
        let Some(value_type) = value_type_for(tag) else {
            report.diagnostics.warn(format!(
                "Unsupported input type \"{}\" for {}.{}",
                tag, report.shader_path, param
            ));
            return Ok(());
        };
        let Some(attr) = convert_value(value, value_type) else {
            log::debug!(
                "{}.{}: {} value not authored as {}",
                report.shader_path,
                param,
                value.type_name(),
                value_type.as_str()
            );
            return Ok(());
        };

        self.network
            .prim_mut(&report.shader_path)?
            .set_input(param, value_type, attr);
        report.authored.push(param.to_string());
        Ok(())
    }

    fn connect_texture(
        &mut self,
        param: &str,
        tag: &TypeTag,
        texture: &TextureReference,
        recipe: &ConversionRecipe,
        cache: &mut TextureCache,
        report: &mut BuildReport,
    ) -> Result<(), GraphError> {
        if *tag == TypeTag::Normal3f && !texture.via_normal_bump {
            match recipe.source_input_type(param) {
                Some(TypeTag::NormalMap) => {}
                Some(_) => {
                    report.diagnostics.warn(format!(
                        "Texture source must be a normal map for {}.{}: {}",
                        recipe.source.id, param, texture.name
                    ));
                    return Ok(());
                }
                None => {
                    let err = GraphError::UnknownSourceType(format!("{}.{}", recipe.source.id, param));
                    report.diagnostics.error(err.to_string());
                    return Ok(());
                }
            }
        }
        let is_normal_map = matches!(recipe.source_input_type(param), Some(TypeTag::NormalMap));

        let Some(value_type) = value_type_for(tag) else {
            report.diagnostics.warn(format!(
                "Unsupported input type \"{}\" for {}.{}",
                tag, report.shader_path, param
            ));
            return Ok(());
        };

        let channel = texture.map_channel.unwrap_or(1);
        let Some(primvar) = self.settings.primvar_for_channel(channel) else {
            report.diagnostics.error(format!(
                "Texture ({}) using a channel not mapped to a primvar.",
                texture.name
            ));
            return Ok(());
        };

        let output = output_channel_name(&texture.output, &texture.name, &mut report.diagnostics);
        let output_type = match output.len() {
            3 => ValueType::Float3,
            1 => ValueType::Float,
            width => {
                let err = GraphError::UnsupportedChannel {
                    channel: output.clone(),
                    width,
                };
                report.diagnostics.error(err.to_string());
                return Ok(());
            }
        };

        let Some(file_path) = texture.file_path.as_deref().filter(|p| !p.is_empty()) else {
            report
                .diagnostics
                .warn(format!("Unsupported texture map: {}", texture.name));
            return Ok(());
        };

        let (graph_path, is_new) = match cache.get(&texture.identity) {
            Some(path) if self.network.contains(path) => (path.to_string(), false),
            _ => {
                let path = self
                    .network
                    .uniquify_child(&self.settings.materials_root, &texture.name);
                cache.insert(texture.identity.clone(), path.clone());
                report.new_graphs.push(path.clone());
                (path, true)
            }
        };
        let uv_texture_path = child_path(&graph_path, prim_name(&graph_path));

        let decomposition = if is_new {
            Some(matconv_uv::decompose(&texture.placement, &texture.name))
        } else {
            None
        };

        if let Some(decomposition) = &decomposition {
            self.network.define(&graph_path, PrimKind::NodeGraph)?;
            let uv_texture = self.network.define(&uv_texture_path, PrimKind::Shader)?;
            uv_texture.shader_id = Some(UV_TEXTURE_ID.to_string());
            let transform = &decomposition.transform;
            uv_texture.set_input(
                "wrapS",
                ValueType::Token,
                AttrValue::Token(transform.wrap_s.as_token().to_string()),
            );
            uv_texture.set_input(
                "wrapT",
                ValueType::Token,
                AttrValue::Token(transform.wrap_t.as_token().to_string()),
            );
            self.author_file(&uv_texture_path, file_path, &mut report.diagnostics)?;
        }

        if texture.linear {
            let uv_texture = self.network.prim_mut(&uv_texture_path)?;
            uv_texture.set_input(
                "sourceColorSpace",
                ValueType::Token,
                AttrValue::Token("raw".to_string()),
            );
            if is_normal_map {
                uv_texture.set_input("scale", ValueType::Float4, AttrValue::Float4([2.0, 2.0, 2.0, 1.0]));
                uv_texture.set_input("bias", ValueType::Float4, AttrValue::Float4([-1.0, -1.0, -1.0, 0.0]));
            }
        }

        self.network
            .prim_mut(&uv_texture_path)?
            .create_output(&output, output_type);
        self.network.prim_mut(&graph_path)?.connect_output(
            &output,
            output_type,
            Connection::output(uv_texture_path.as_str(), &output),
        );

        let existing_ref = self
            .network
            .children(&report.material_path)
            .find(|p| p.kind == PrimKind::NodeGraph && p.references.iter().any(|r| *r == graph_path))
            .map(|p| p.path.clone());
        let local_ref = match existing_ref {
            Some(path) => path,
            None => {
                let path = self
                    .network
                    .uniquify_child(&report.material_path, prim_name(&graph_path));
                self.network
                    .define(&path, PrimKind::NodeGraph)?
                    .add_reference(&graph_path);
                path
            }
        };

        if let Some(mut decomposition) = decomposition {
            self.build_uv_chain(&graph_path, &uv_texture_path, &primvar, &decomposition.transform)?;
            report.diagnostics.append(&mut decomposition.diagnostics);
        }

        self.network.prim_mut(&report.shader_path)?.connect_input(
            param,
            value_type,
            Connection::output(local_ref, &output),
        );
        report.connected.push(param.to_string());
        Ok(())
    }

    fn author_file(
        &mut self,
        uv_texture_path: &str,
        file_path: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), GraphError> {
        let mut path = file_path.to_string();
        if self.settings.relative_texture_paths {
            if let Some(layer_dir) = self
                .settings
                .layer_path
                .as_ref()
                .and_then(|p| paths::parent_dir(&p.to_string_lossy()))
            {
                path = paths::relative_to(&path, &layer_dir);
            }
        }

        if paths::has_non_ascii(&path) {
            diagnostics.warn(
                "USD does not support unicode in filepaths. Please remove invalid characters from texture filepaths.",
            );
            return Ok(());
        }
        self.network.prim_mut(uv_texture_path)?.set_input(
            "file",
            ValueType::Asset,
            AttrValue::Asset(paths::asset_path(&path)),
        );
        Ok(())
    }

    /// Primvar reader and optional transform feeding the texture's `st`.
    fn build_uv_chain(
        &mut self,
        graph_path: &str,
        uv_texture_path: &str,
        primvar: &str,
        transform: &TextureTransform2D,
    ) -> Result<(), GraphError> {
        let frame_input = format!("frame:{}", primvar);
        self.network.prim_mut(graph_path)?.set_input(
            &frame_input,
            ValueType::Token,
            AttrValue::Token(primvar.to_string()),
        );

        let reader_path = self
            .network
            .uniquify_child(graph_path, &format!("PrimvarReader_{}", primvar));
        let reader = self.network.define(&reader_path, PrimKind::Shader)?;
        reader.shader_id = Some(PRIMVAR_READER_ID.to_string());
        reader.connect_input(
            "varname",
            ValueType::String,
            Connection::input(graph_path, &frame_input),
        );
        reader.create_output("result", ValueType::Float2);

        let mut st_source = Connection::output(reader_path.as_str(), "result");

        if !transform.is_identity() {
            let transform_path = self
                .network
                .uniquify_child(graph_path, &format!("TextureTransform_{}", primvar));
            let node = self.network.define(&transform_path, PrimKind::Shader)?;
            node.shader_id = Some(TRANSFORM_2D_ID.to_string());
            node.connect_input("in", ValueType::Float2, st_source);
            if transform.has_scale() {
                node.set_input("scale", ValueType::Float2, AttrValue::Float2(transform.scale));
            }
            if transform.has_rotation() {
                node.set_input(
                    "rotation",
                    ValueType::Float,
                    AttrValue::Float(transform.rotation_degrees),
                );
            }
            if transform.has_translation() {
                node.set_input(
                    "translation",
                    ValueType::Float2,
                    AttrValue::Float2(transform.translation),
                );
            }
            node.create_output("result", ValueType::Float2);
            st_source = Connection::output(transform_path, "result");
        }

        self.network
            .prim_mut(uv_texture_path)?
            .connect_input("st", ValueType::Float2, st_source);
        Ok(())
    }
}

/// Network value type of a target definition input.
pub fn value_type_for(tag: &TypeTag) -> Option<ValueType> {
    match tag {
        TypeTag::Float => Some(ValueType::Float),
        TypeTag::Int => Some(ValueType::Int),
        TypeTag::Float3 => Some(ValueType::Float3),
        TypeTag::Normal3f => Some(ValueType::Normal3f),
        TypeTag::Color3f => Some(ValueType::Color3f),
        _ => None,
    }
}

/// Convert a plain value to an attribute of `value_type`. A color feeding a
/// scalar takes its luminance.
fn convert_value(value: &Value, value_type: ValueType) -> Option<AttrValue> {
    match value_type {
        ValueType::Float => match value {
            Value::Color(c) => Some(AttrValue::Float(c.luminance())),
            v => v.as_f64().map(AttrValue::Float),
        },
        ValueType::Int => match value {
            Value::Int(i) => Some(AttrValue::Int(*i)),
            Value::Bool(b) => Some(AttrValue::Int(i64::from(*b))),
            Value::Float(f) => Some(AttrValue::Int(*f as i64)),
            _ => None,
        },
        ValueType::Float3 | ValueType::Color3f | ValueType::Normal3f => match value {
            Value::Color(c) => Some(AttrValue::Float3(c.to_array())),
            Value::Vector3(v) => Some(AttrValue::Float3(*v)),
            v => v.as_f64().map(|f| AttrValue::Float3([f, f, f])),
        },
        _ => None,
    }
}

/// Output name consumed on a texture. Selector indexes outside rgb/r/g/b/a
/// fall back to `r`.
fn output_channel_name(output: &OutputChannel, texture: &str, diagnostics: &mut Diagnostics) -> String {
    match output {
        OutputChannel::Default => "rgb".to_string(),
        OutputChannel::Name(name) => name.clone(),
        OutputChannel::Index(index) => match SELECTOR_OUTPUTS.iter().find(|(i, _)| i == index) {
            Some((_, name)) => name.to_string(),
            None => {
                diagnostics.warn(format!(
                    "Unsupported output channel index for {}: {}. Using 'r' channel instead.",
                    texture, index
                ));
                "r".to_string()
            }
        },
    }
}
