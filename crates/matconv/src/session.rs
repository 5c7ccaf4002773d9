//! Conversion sessions.
//!
//! A session owns the reuse cache of one export or import run and converts
//! materials one at a time. A failure converting one material never stops
//! the others: batch methods return one outcome per material.

use matconv_core::{MatConvError, PropertyReadable, Result, SourcePlacement, Value};
use matconv_graph::network::{parent_path, prim_name};
use matconv_graph::{
    usda, BuildReport, BuildSettings, GraphBuilder, ImportBuilder, ImportReport, ImportSettings,
    NativeTexture, NativeTextureCache, NetworkShader, PrimKind, ShadingNetwork, TextureCache,
};
use matconv_mapper::ResolvedMapping;
use matconv_recipe::{RecipeCache, RecipeIndex};
use std::path::PathBuf;
use std::sync::Arc;

use crate::options::{ExportOptions, ImportOptions};

pub const MAX_DOMAIN: &str = "3dsmax";
pub const USD_DOMAIN: &str = "usd";

/// Result of converting one material.
#[derive(Debug)]
pub struct Outcome<T> {
    pub material: String,
    pub result: Result<T>,
}

impl<T> Outcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A texture the host must render to a file before the layer is usable.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeRequest {
    pub texture: String,
    pub file_path: PathBuf,
}

/// Converts host materials into one shading network.
pub struct ExportSession {
    options: ExportOptions,
    settings: BuildSettings,
    recipes: Arc<RecipeIndex>,
    network: ShadingNetwork,
    cache: TextureCache,
    bake_requests: Vec<BakeRequest>,
}

impl ExportSession {
    /// Start a session using the process-wide recipe cache for the
    /// options' search roots.
    pub fn new(options: ExportOptions) -> Self {
        let recipes = RecipeCache::global().get_or_load(&options.recipe_roots);
        Self::with_recipes(options, recipes)
    }

    pub fn with_recipes(options: ExportOptions, recipes: Arc<RecipeIndex>) -> Self {
        Self {
            settings: options.build_settings(),
            options,
            recipes,
            network: ShadingNetwork::new(),
            cache: TextureCache::new(),
            bake_requests: Vec::new(),
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn recipes(&self) -> &RecipeIndex {
        &self.recipes
    }

    /// Convert one material into the session's network.
    pub fn export_material(&mut self, material: &dyn PropertyReadable) -> Result<BuildReport> {
        let recipes = Arc::clone(&self.recipes);
        let recipe = recipes.lookup(
            material.class_id(),
            MAX_DOMAIN,
            &self.options.target_material_id,
            USD_DOMAIN,
        )?;
        let mut resolved = matconv_mapper::resolve(material, recipe)?;
        if self.options.bake {
            self.redirect_to_baked(&mut resolved);
        }

        let name = if material.name().is_empty() {
            material.class_id()
        } else {
            material.name()
        };
        let material_path = self
            .network
            .uniquify_child(&self.settings.materials_root, name);
        log::debug!("exporting {} to {}", name, material_path);

        let mut report = GraphBuilder::new(&mut self.network, &self.settings).build(
            &material_path,
            &resolved,
            recipe,
            &mut self.cache,
        )?;
        let mut diagnostics = std::mem::take(&mut resolved.diagnostics);
        diagnostics.append(&mut report.diagnostics);
        report.diagnostics = diagnostics;
        Ok(report)
    }

    pub fn export_all<'m, I>(&mut self, materials: I) -> Vec<Outcome<BuildReport>>
    where
        I: IntoIterator<Item = &'m dyn PropertyReadable>,
    {
        materials
            .into_iter()
            .map(|material| {
                let result = self.export_material(material);
                if let Err(err) = &result {
                    log::warn!("Material {} not exported: {}", material.name(), err);
                }
                Outcome {
                    material: material.name().to_string(),
                    result,
                }
            })
            .collect()
    }

    /// Point every texture at its baked file and drop its placement: the
    /// baked image already carries it.
    fn redirect_to_baked(&mut self, resolved: &mut ResolvedMapping) {
        for value in resolved.values.values_mut().flatten() {
            let Value::Texture(texture) = value else {
                continue;
            };
            let file_path = self.options.baked_texture_path(&texture.name);
            texture.file_path = Some(file_path.to_string_lossy().into_owned());
            texture.placement = SourcePlacement::None;
            texture.output = Default::default();
            let request = BakeRequest {
                texture: texture.name.clone(),
                file_path,
            };
            if !self.bake_requests.contains(&request) {
                self.bake_requests.push(request);
            }
        }
    }

    pub fn bake_requests(&self) -> &[BakeRequest] {
        &self.bake_requests
    }

    pub fn network(&self) -> &ShadingNetwork {
        &self.network
    }

    pub fn into_network(self) -> ShadingNetwork {
        self.network
    }

    pub fn to_usda(&self) -> String {
        usda::write_network(&self.network)
    }
}

/// Converts network shaders into native material tables.
pub struct ImportSession {
    options: ImportOptions,
    settings: ImportSettings,
    recipes: Arc<RecipeIndex>,
    cache: NativeTextureCache,
}

impl ImportSession {
    pub fn new(options: ImportOptions) -> Self {
        let recipes = RecipeCache::global().get_or_load(&options.recipe_roots);
        Self::with_recipes(options, recipes)
    }

    pub fn with_recipes(options: ImportOptions, recipes: Arc<RecipeIndex>) -> Self {
        Self {
            settings: options.import_settings(),
            options,
            recipes,
            cache: NativeTextureCache::new(),
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Convert the shader at `shader_path`. The material takes the name of
    /// the enclosing `Material` prim when there is one.
    pub fn import_shader(&mut self, network: &ShadingNetwork, shader_path: &str) -> Result<ImportReport> {
        let shader = NetworkShader::new(network, shader_path)?;
        let recipe = self.recipes.lookup(
            shader.class_id(),
            USD_DOMAIN,
            &self.options.material_target_id,
            MAX_DOMAIN,
        )?;
        let mut resolved = matconv_mapper::resolve(&shader, recipe)?;

        let name = parent_path(shader_path)
            .and_then(|parent| network.get(parent))
            .filter(|parent| parent.kind == PrimKind::Material)
            .map_or_else(|| prim_name(shader_path), |parent| parent.name());

        let mut report =
            ImportBuilder::new(&self.settings).build(name, &resolved, recipe, &mut self.cache);
        let mut diagnostics = std::mem::take(&mut resolved.diagnostics);
        diagnostics.append(&mut report.diagnostics);
        report.diagnostics = diagnostics;
        Ok(report)
    }

    /// Convert the surface shader of every material in `network`.
    pub fn import_network(&mut self, network: &ShadingNetwork) -> Vec<Outcome<ImportReport>> {
        let materials: Vec<(String, Option<String>)> = network
            .prims()
            .filter(|prim| prim.kind == PrimKind::Material)
            .map(|prim| {
                let surface = prim
                    .outputs
                    .get("surface")
                    .and_then(|output| output.connection.as_ref())
                    .map(|connection| connection.prim.clone());
                (prim.path.clone(), surface)
            })
            .collect();

        materials
            .into_iter()
            .map(|(material, surface)| {
                let result = match surface {
                    Some(shader_path) => self.import_shader(network, &shader_path),
                    None => Err(MatConvError::Graph(matconv_core::GraphError::MissingPrim(
                        format!("{}.outputs:surface", material),
                    ))),
                };
                if let Err(err) = &result {
                    log::warn!("Material {} not imported: {}", material, err);
                }
                Outcome { material, result }
            })
            .collect()
    }

    pub fn textures(&self) -> impl Iterator<Item = &NativeTexture> {
        self.cache.textures()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matconv_core::{Color, MappingError, PropertyBag, RecipeError, TextureReference, UvwCoordinates};
    use matconv_graph::{AttrValue, Connection, NativeProperty};
    use std::fs;

    const DATA: [(&str, &str); 3] = [
        ("materials.mat_def", include_str!("../data/materials.mat_def")),
        (
            "physical_material.material_conversion",
            include_str!("../data/physical_material.material_conversion"),
        ),
        (
            "max_usd_preview_surface.material_conversion",
            include_str!("../data/max_usd_preview_surface.material_conversion"),
        ),
    ];

    fn recipes() -> (tempfile::TempDir, Arc<RecipeIndex>) {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in DATA {
            fs::write(dir.path().join(name), text).unwrap();
        }
        let index = Arc::new(RecipeIndex::load(&[dir.path().to_path_buf()]));
        (dir, index)
    }

    fn wood() -> TextureReference {
        TextureReference::new("wood", "/maps/wood.png")
    }

    #[test]
    fn test_bundled_data_loads_cleanly() {
        let (_dir, index) = recipes();
        assert!(index.diagnostics().is_empty());
        assert_eq!(index.definitions().count(), 3);
        assert_eq!(index.recipes().count(), 3);
    }

    #[test]
    fn test_export_physical_material() {
        let (_dir, index) = recipes();
        let mut session = ExportSession::with_recipes(ExportOptions::default(), index);

        let floor = PropertyBag::new("PhysicalMaterial")
            .named("Floor")
            .with("base_color", Color::rgb(0.8, 0.6, 0.4))
            .with("base_weight", 0.5)
            .with("roughness", 0.25)
            .with("roughness_inv", true)
            .with("transparency", 0.0)
            .with("metalness_map", Value::texture(wood()))
            .with("metalness_map_on", true);
        let report = session.export_material(&floor).unwrap();

        assert_eq!(report.material_path, "/Materials/Floor");
        let shader = session.network().get("/Materials/Floor/UsdPreviewSurface").unwrap();
        assert_eq!(
            shader.input_value("diffuseColor"),
            Some(&AttrValue::Float3([0.4, 0.3, 0.2]))
        );
        assert_eq!(shader.input_value("roughness"), Some(&AttrValue::Float(0.75)));
        assert_eq!(shader.input_value("opacity"), Some(&AttrValue::Float(1.0)));
        assert_eq!(
            shader.input_connection("metallic"),
            Some(&Connection::output("/Materials/Floor/wood", "rgb"))
        );
        assert!(report.diagnostics.is_empty());

        let usda = session.to_usda();
        assert!(usda.contains("def Material \"Floor\""));
        assert!(usda.contains("float inputs:roughness = 0.75"));
    }

    #[test]
    fn test_export_all_reports_each_material() {
        let (_dir, index) = recipes();
        let mut session = ExportSession::with_recipes(ExportOptions::default(), index);

        let good = PropertyBag::new("MaxUsdPreviewSurface").named("Good").with("roughness", 0.5);
        let unknown = PropertyBag::new("StandardMaterial").named("Legacy");
        let broken = PropertyBag::new("PhysicalMaterial")
            .named("Broken")
            .with("base_color", Color::rgb(1.0, 1.0, 1.0))
            .with("base_weight", "heavy");
        let outcomes = session.export_all([
            &good as &dyn PropertyReadable,
            &unknown as &dyn PropertyReadable,
            &broken as &dyn PropertyReadable,
        ]);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(MatConvError::Recipe(RecipeError::RecipeNotFound { .. }))
        ));
        // A non-numeric multiplier only drops that parameter.
        let broken = outcomes[2].result.as_ref().unwrap();
        assert!(!broken.authored.contains(&"diffuseColor".to_string()));
        assert_eq!(broken.diagnostics.error_count(), 1);
        assert!(session.network().contains("/Materials/Broken"));
    }

    #[test]
    fn test_duplicate_material_names_are_uniquified() {
        let (_dir, index) = recipes();
        let mut session = ExportSession::with_recipes(ExportOptions::default(), index);
        let a = PropertyBag::new("MaxUsdPreviewSurface").named("Mat 1");
        let first = session.export_material(&a).unwrap();
        let second = session.export_material(&a).unwrap();
        assert_eq!(first.material_path, "/Materials/Mat_1");
        assert_eq!(second.material_path, "/Materials/Mat_1_1");
    }

    #[test]
    fn test_bake_redirects_textures() {
        let (_dir, index) = recipes();
        let options = ExportOptions::default()
            .with_layer_path("/out/scene.usda")
            .with_bake(true);
        let mut session = ExportSession::with_recipes(options, index);
        let texture = wood().with_placement(SourcePlacement::Bitmap(
            UvwCoordinates::default().with_tiling(3.0, 3.0),
        ));
        let material = PropertyBag::new("MaxUsdPreviewSurface")
            .named("Floor")
            .with("diffuseColor_map", Value::texture(texture));
        session.export_material(&material).unwrap();

        assert_eq!(
            session.bake_requests(),
            &[BakeRequest {
                texture: "wood".into(),
                file_path: PathBuf::from("/out/baked_textures/wood.png"),
            }]
        );
        let uv = session.network().get("/Materials/wood/wood").unwrap();
        assert_eq!(
            uv.input_value("file"),
            Some(&AttrValue::Asset("./baked_textures/wood.png".into()))
        );
        assert!(!session.network().contains("/Materials/wood/TextureTransform_st"));
    }

    #[test]
    fn test_round_trip_through_network() {
        let (_dir, index) = recipes();
        let mut export = ExportSession::with_recipes(ExportOptions::default(), index.clone());
        let material = PropertyBag::new("MaxUsdPreviewSurface")
            .named("Floor")
            .with("diffuseColor", Color::rgb(0.1, 0.2, 0.3))
            .with("roughness_map", Value::texture(wood()))
            .with("metallic", 1.0);
        export.export_material(&material).unwrap();
        let network = export.into_network();

        let mut import = ImportSession::with_recipes(ImportOptions::default(), index);
        let outcomes = import.import_network(&network);
        assert_eq!(outcomes.len(), 1);
        let report = outcomes[0].result.as_ref().unwrap();

        let imported = &report.material;
        assert_eq!(imported.name, "Floor");
        assert_eq!(imported.class_id, "MaxUsdPreviewSurface");
        assert_eq!(
            imported.value("diffuseColor"),
            Some(&Value::Color(Color::rgb(0.1, 0.2, 0.3)))
        );
        assert_eq!(imported.value("metallic"), Some(&Value::Float(1.0)));
        assert!(matches!(
            imported.get("roughness_map"),
            Some(NativeProperty::Texture(slot)) if slot.texture == "wood"
        ));
        assert_eq!(import.textures().count(), 1);
    }

    #[test]
    fn test_import_missing_recipe_and_shader() {
        let (_dir, index) = recipes();
        let mut session = ImportSession::with_recipes(
            ImportOptions::default().with_material_target_id("PhysicalMaterial"),
            index,
        );
        let mut network = ShadingNetwork::new();
        network.define("/Materials/Empty", PrimKind::Material).unwrap();
        let shader = network
            .define("/Materials/Red/UsdPreviewSurface", PrimKind::Shader)
            .unwrap();
        shader.shader_id = Some("UsdPreviewSurface".into());

        assert!(matches!(
            session.import_shader(&network, "/Materials/Red/UsdPreviewSurface"),
            Err(MatConvError::Recipe(RecipeError::RecipeNotFound { .. }))
        ));
        assert!(matches!(
            session.import_shader(&network, "/Materials/Nope"),
            Err(MatConvError::Graph(_))
        ));

        let outcomes = session.import_network(&network);
        // "/Materials/Red" is a scope, only the empty material is listed.
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].is_ok());
    }

    #[test]
    fn test_mapping_error_is_reported() {
        let err: MatConvError = MappingError::EmptyMapping.into();
        assert!(matches!(err, MatConvError::Mapping(MappingError::EmptyMapping)));
    }
}
