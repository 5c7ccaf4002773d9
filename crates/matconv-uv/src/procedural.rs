//! Procedural dialect (OSL UberBitmap and the simple OSL bitmap).

use glam::{DMat2, DVec2};
use matconv_core::{
    safe_div, Diagnostics, OslBitmapPlacement, TextureTransform2D, UberBitmapPlacement,
};

use crate::matrix::warn_non_uniform_rotation;
use crate::wrap::procedural_wrap;

/// `-scale * offset`, with a zero offset staying zero under an infinite scale.
fn scaled_offset(scale: f64, offset: f64) -> f64 {
    if offset == 0.0 {
        0.0
    } else {
        -(scale * offset)
    }
}

fn warn_driven_inputs(shader: &str, inputs: &[String], diagnostics: &mut Diagnostics) {
    for input in inputs {
        diagnostics.warn(format!(
            "The OSL {} {} input is not supported when exporting to USD. Only static texture transforms are supported.",
            shader, input
        ));
    }
}

/// Only rotations around +W can be expressed in the target.
fn supported_rotation_axis(axis: [f64; 3], texture_name: &str, diagnostics: &mut Diagnostics) -> bool {
    let reason = if axis[0] != 0.0 {
        format!("X axis value {} found on {} - value must be equal to 0.0", axis[0], texture_name)
    } else if axis[1] != 0.0 {
        format!("Y axis value {} found on {} - value must be equal to 0.0", axis[1], texture_name)
    } else if axis[2] <= 0.0 {
        format!("Z axis value {} found on {} - value must be greater than 0.0", axis[2], texture_name)
    } else {
        return true;
    };
    diagnostics.warn(format!(
        "Unsupported texture rotation, {}. Texture rotation will be ignored.",
        reason
    ));
    false
}

/// Resolve UberBitmap parameters into a `UsdTransform2d` parameter set.
pub fn decompose_uberbitmap(
    placement: &UberBitmapPlacement,
    texture_name: &str,
    diagnostics: &mut Diagnostics,
) -> TextureTransform2D {
    warn_driven_inputs("UberBitmap", &placement.driven_inputs, diagnostics);

    let world = if placement.real_world {
        [placement.real_width, placement.real_height]
    } else {
        [1.0, 1.0]
    };
    let scale = [
        safe_div(placement.tiling[0], placement.scale * world[0]),
        safe_div(placement.tiling[1], placement.scale * world[1]),
    ];

    // The shader moves the texture, the transform moves the UVs.
    let mut translation = DVec2::new(
        scaled_offset(scale[0], placement.offset[0]),
        scaled_offset(scale[1], placement.offset[1]),
    );

    let mut rotation = 0.0;
    if placement.rotate != 0.0 && supported_rotation_axis(placement.rot_axis, texture_name, diagnostics) {
        // An infinite scale leaves the translation unrotated: mixing the
        // axes would turn it into NaN.
        if scale.iter().all(|s| s.is_finite()) {
            let center = DVec2::new(
                placement.rot_center[0] * scale[0],
                placement.rot_center[1] * scale[1],
            );
            let rot = DMat2::from_angle(placement.rotate.to_radians());
            translation = rot * (translation - center) + center;
        }
        rotation = placement.rotate;
    }

    warn_non_uniform_rotation(scale, rotation, texture_name, diagnostics);

    let wrap = procedural_wrap(placement.wrap_mode, diagnostics);
    TextureTransform2D {
        scale,
        rotation_degrees: rotation,
        translation: translation.to_array(),
        wrap_s: wrap,
        wrap_t: wrap,
    }
}

/// Resolve simple OSL bitmap parameters. Only a uniform scale is expressible.
pub fn decompose_oslbitmap(
    placement: &OslBitmapPlacement,
    diagnostics: &mut Diagnostics,
) -> TextureTransform2D {
    warn_driven_inputs("Bitmap", &placement.driven_inputs, diagnostics);

    let scale = if placement.scale != 0.0 {
        1.0 / placement.scale
    } else {
        1.0
    };
    let wrap = procedural_wrap(placement.wrap_mode, diagnostics);
    TextureTransform2D {
        scale: [scale, scale],
        wrap_s: wrap,
        wrap_t: wrap,
        ..Default::default()
    }
}
