//! Command-line material converter.
//!
//! `export` converts JSON property-bag materials into a USDA layer.
//! `import` converts the materials of a JSON shading network into native
//! material tables, printed as JSON. `recipes` lists what the search roots
//! provide.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use matconv::core::{Diagnostics, PropertyReadable};
use matconv::graph::{NativeMaterial, NativeTexture};
use matconv::recipe::RecipeCache;
use matconv::{ExportOptions, ExportSession, ImportOptions, ImportSession};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recipe search root (repeatable; later roots override earlier ones).
    #[arg(long = "recipes", short = 'r', global = true, value_name = "DIR")]
    recipe_roots: Vec<PathBuf>,

    /// Log debug output.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert host materials to a USDA layer.
    Export {
        /// JSON file of property-bag materials.
        #[arg(value_name = "MATERIALS")]
        input: PathBuf,

        /// Layer to write; printed to stdout when omitted.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Shader id to convert to.
        #[arg(long, default_value = "UsdPreviewSurface")]
        target: String,

        /// Scope holding materials and textures.
        #[arg(long, default_value = "Materials")]
        materials_root: String,

        /// Keep texture paths absolute.
        #[arg(long)]
        absolute_paths: bool,

        /// Reference baked texture files instead of the source textures.
        #[arg(long)]
        bake: bool,
    },

    /// Convert the materials of a JSON shading network to native materials.
    Import {
        /// JSON shading network.
        #[arg(value_name = "NETWORK")]
        input: PathBuf,

        /// Where to write the JSON result; printed to stdout when omitted.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Native material class to convert to.
        #[arg(long, default_value = "MaxUsdPreviewSurface")]
        target: String,

        /// Native texture type: Bitmaptexture or an OSL bitmap shader file.
        #[arg(long, default_value = "Bitmaptexture")]
        texture: String,

        /// Layer the network came from, for relative texture paths.
        #[arg(long)]
        layer: Option<PathBuf>,
    },

    /// List material definitions and conversion recipes.
    Recipes,
}

#[derive(Serialize)]
struct ImportOutput<'a> {
    materials: Vec<NativeMaterial>,
    textures: Vec<&'a NativeTexture>,
}

fn report(material: &str, diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{}: {}", material, diagnostic);
    }
}

fn write_or_print(output: Option<&PathBuf>, text: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text).with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn run_export(
    roots: Vec<PathBuf>,
    input: PathBuf,
    output: Option<PathBuf>,
    options: ExportOptions,
) -> Result<()> {
    let materials = matconv::load_materials(&input)
        .with_context(|| format!("loading materials from {}", input.display()))?;

    let mut options = options;
    options.recipe_roots = roots;
    if let Some(path) = &output {
        options.layer_path = Some(path.clone());
    }
    let mut session = ExportSession::new(options);
    if session.recipes().is_empty() {
        bail!("no conversion recipes found; pass --recipes DIR");
    }

    let outcomes = session.export_all(materials.iter().map(|m| m as &dyn PropertyReadable));
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(build) => report(&outcome.material, &build.diagnostics),
            Err(err) => {
                failed += 1;
                eprintln!("{}: {}", outcome.material, err);
            }
        }
    }
    for request in session.bake_requests() {
        eprintln!("bake {} -> {}", request.texture, request.file_path.display());
    }

    write_or_print(output.as_ref(), &session.to_usda())?;
    log::info!("exported {} of {} materials", outcomes.len() - failed, outcomes.len());
    Ok(())
}

fn run_import(roots: Vec<PathBuf>, input: PathBuf, output: Option<PathBuf>, options: ImportOptions) -> Result<()> {
    let network = matconv::load_network(&input)
        .with_context(|| format!("loading network from {}", input.display()))?;

    let mut options = options;
    options.recipe_roots = roots;
    let mut session = ImportSession::new(options);

    let mut materials = Vec::new();
    for outcome in session.import_network(&network) {
        match outcome.result {
            Ok(imported) => {
                report(&outcome.material, &imported.diagnostics);
                materials.push(imported.material);
            }
            Err(err) => eprintln!("{}: {}", outcome.material, err),
        }
    }

    let result = ImportOutput {
        materials,
        textures: session.textures().collect(),
    };
    write_or_print(output.as_ref(), &serde_json::to_string_pretty(&result)?)
}

fn run_recipes(roots: Vec<PathBuf>) -> Result<()> {
    let index = RecipeCache::global().get_or_load(&roots);
    report("recipes", index.diagnostics());

    println!("Material definitions:");
    for def in index.definitions() {
        println!("  {} ({}): {} inputs", def.id, def.domain, def.inputs.len());
    }
    println!("Conversion recipes:");
    for recipe in index.recipes() {
        println!(
            "  {}: {} ({}) -> {} ({})",
            recipe.key, recipe.source.id, recipe.source.domain, recipe.target.id, recipe.target.domain
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match args.command {
        Command::Export {
            input,
            output,
            target,
            materials_root,
            absolute_paths,
            bake,
        } => {
            let options = ExportOptions::new()
                .with_target_material_id(target)
                .with_materials_root(materials_root)
                .with_relative_texture_paths(!absolute_paths)
                .with_bake(bake);
            run_export(args.recipe_roots, input, output, options)
        }
        Command::Import {
            input,
            output,
            target,
            texture,
            layer,
        } => {
            let mut options = ImportOptions::new()
                .with_material_target_id(target)
                .with_texture_target_id(texture);
            if let Some(layer) = layer {
                options = options.with_layer_path(layer);
            }
            run_import(args.recipe_roots, input, output, options)
        }
        Command::Recipes => run_recipes(args.recipe_roots),
    }
}
