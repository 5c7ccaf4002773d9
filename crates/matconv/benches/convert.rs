//! Conversion benchmarks.

use criterion::{criterion_group, criterion_main, Criterion, black_box};
use std::fs;

use matconv::core::{
    Color, PropertyBag, SourcePlacement, TextureReference, UberBitmapPlacement, UvwCoordinates, Value,
};
use matconv::recipe::RecipeIndex;
use matconv::{ExportOptions, ExportSession};

const DATA: [(&str, &str); 2] = [
    ("materials.mat_def", include_str!("../data/materials.mat_def")),
    (
        "physical_material.material_conversion",
        include_str!("../data/physical_material.material_conversion"),
    ),
];

fn floor() -> PropertyBag {
    let wood = TextureReference::new("wood", "C:/maps/wood.png")
        .with_placement(SourcePlacement::Bitmap(UvwCoordinates::default().with_tiling(2.0, 2.0)));
    PropertyBag::new("PhysicalMaterial")
        .named("Floor")
        .with("base_color", Color::rgb(0.8, 0.6, 0.4))
        .with("base_color_map", Value::texture(wood))
        .with("roughness", 0.4)
        .with("roughness_inv", true)
        .with("transparency", 0.25)
}

fn recipes() -> (tempfile::TempDir, RecipeIndex) {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in DATA {
        fs::write(dir.path().join(name), text).unwrap();
    }
    let index = RecipeIndex::load(&[dir.path().to_path_buf()]);
    (dir, index)
}

fn resolve_physical(c: &mut Criterion) {
    let (_dir, index) = recipes();
    let recipe = index
        .lookup("PhysicalMaterial", "3dsmax", "UsdPreviewSurface", "usd")
        .unwrap();
    let material = floor();
    c.bench_function("resolve_physical", |b| {
        b.iter(|| matconv::mapper::resolve(black_box(&material), recipe))
    });
}

fn decompose_placements(c: &mut Criterion) {
    let bitmap = SourcePlacement::Bitmap(
        UvwCoordinates::default()
            .with_tiling(2.0, 3.0)
            .with_offset(0.1, 0.2)
            .with_angles(0.0, 0.0, 30.0),
    );
    let uber = SourcePlacement::UberBitmap(UberBitmapPlacement {
        tiling: [2.0, 2.0, 1.0],
        offset: [0.25, 0.0, 0.0],
        rotate: 45.0,
        ..UberBitmapPlacement::default()
    });

    c.bench_function("decompose_bitmap", |b| {
        b.iter(|| matconv::uv::decompose(black_box(&bitmap), "wood"))
    });
    c.bench_function("decompose_uberbitmap", |b| {
        b.iter(|| matconv::uv::decompose(black_box(&uber), "wood"))
    });
}

fn export_session(c: &mut Criterion) {
    let (dir, _index) = recipes();
    let material = floor();
    c.bench_function("export_material", |b| {
        b.iter(|| {
            let options = ExportOptions::new()
                .with_recipe_root(dir.path())
                .with_layer_path("/out/scene.usda");
            let mut session = ExportSession::new(options);
            let _ = session.export_material(black_box(&material));
            session.to_usda()
        })
    });
}

criterion_group!(benches, resolve_physical, decompose_placements, export_session);
criterion_main!(benches);
