//! Coordinate-matrix dialect (classic bitmap `coordinates` block).
//!
//! The host composes tiling, offset and the three angles into a single UVW
//! matrix and decomposes it again into scale, Euler rotation and translation
//! when asked for its parts. A reflection is never left in the scale: it is
//! folded into the rotation, which is how a negative tiling on one axis turns
//! into a 180 degree turn around U or V. We reproduce that round trip, then
//! undo the folding so the result only rotates around W.

use glam::{DAffine3, DMat3, DVec3};
use matconv_core::{
    float_almost_equal, normalize_angle, safe_div, Diagnostics, TextureTransform2D,
    UvwCoordinates,
};

use crate::wrap::bitmap_wrap_modes;

/// Scale, rotation and translation as the host reports them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerDecomposition {
    /// Always positive.
    pub scale: DVec3,
    /// Euler angles in degrees, applied X then Y then Z.
    pub rotation: DVec3,
    pub translation: DVec3,
}

/// The affine UVW transform of a coordinates block.
///
/// `p' = S * Rz * Ry * Rx * (p - pivot - offset) + pivot`, where the pivot is
/// the tile center, or the origin when real-world scale is on.
pub fn uvw_transform(coords: &UvwCoordinates) -> DAffine3 {
    let (pivot, scale) = if coords.real_world_scale {
        (
            DVec3::ZERO,
            DVec3::new(
                safe_div(coords.u_tiling, coords.real_world_width),
                safe_div(coords.v_tiling, coords.real_world_height),
                1.0,
            ),
        )
    } else {
        (
            DVec3::splat(0.5),
            DVec3::new(coords.u_tiling, coords.v_tiling, 1.0),
        )
    };

    let rotation = DMat3::from_rotation_z(coords.w_angle.to_radians())
        * DMat3::from_rotation_y(coords.v_angle.to_radians())
        * DMat3::from_rotation_x(coords.u_angle.to_radians());
    let linear = DMat3::from_diagonal(scale) * rotation;
    let offset = DVec3::new(coords.u_offset, coords.v_offset, 0.0);

    DAffine3::from_mat3_translation(linear, pivot - linear * (pivot + offset))
}

/// Split an affine transform into positive scale, Euler rotation and
/// translation. A negative determinant is absorbed by the rotation.
pub fn decompose_affine(transform: &DAffine3) -> EulerDecomposition {
    let linear = transform.matrix3;
    let scale = DVec3::new(
        linear.row(0).length(),
        linear.row(1).length(),
        linear.row(2).length(),
    );

    let inv = DVec3::new(
        safe_div(1.0, scale.x),
        safe_div(1.0, scale.y),
        safe_div(1.0, scale.z),
    );
    let mut rotation = DMat3::from_diagonal(inv) * linear;
    if rotation.determinant() < 0.0 {
        rotation = rotation * -1.0;
    }

    let (x, y, z) = euler_xyz(&rotation);

    EulerDecomposition {
        scale,
        rotation: DVec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees()),
        translation: transform.translation,
    }
}

/// Euler angles (radians) of `R = Rz * Ry * Rx`.
fn euler_xyz(r: &DMat3) -> (f64, f64, f64) {
    let r0 = r.row(0);
    let r1 = r.row(1);
    let r2 = r.row(2);
    let y = (-r2.x).clamp(-1.0, 1.0).asin();
    let x = r2.y.atan2(r2.z);
    let z = r1.x.atan2(r0.x);
    (x, y, z)
}

/// Resolve a coordinates block into a `UsdTransform2d` parameter set.
pub fn decompose_bitmap(
    coords: &UvwCoordinates,
    texture_name: &str,
    diagnostics: &mut Diagnostics,
) -> TextureTransform2D {
    let (wrap_s, wrap_t) = bitmap_wrap_modes(coords);
    let identity = TextureTransform2D {
        wrap_s,
        wrap_t,
        ..Default::default()
    };

    if coords.mapping_type != 0 {
        diagnostics.warn(format!(
            "Unsupported texture mapping type on {}. Only \"Texture\" is supported when exporting to USD.",
            texture_name
        ));
        return identity;
    }
    if coords.mapping != 0 && coords.mapping != 1 {
        diagnostics.warn(format!(
            "Unsupported texture mapping on {}. Only \"Explicit Map Channel\" or \"Vertex Color Channel\" are supported when exporting to USD.",
            texture_name
        ));
        return identity;
    }

    let parts = decompose_affine(&uvw_transform(coords));
    let mut scale = [parts.scale.x, parts.scale.y];
    let mut translation = [parts.translation.x, parts.translation.y];
    let mut rotation = parts.rotation;

    // Mirroring flips the UVs in place; a doubled tile reproduces it.
    if coords.u_mirror {
        scale[0] *= 2.0;
        translation[0] *= 2.0;
    }
    if coords.v_mirror {
        scale[1] *= 2.0;
        translation[1] *= 2.0;
    }

    if coords.u_tiling < 0.0 && coords.v_tiling < 0.0 {
        scale = [-scale[0], -scale[1]];
        rotation.z = normalize_angle(rotation.z - 180.0);
    } else if coords.u_tiling < 0.0 {
        scale[0] = -scale[0];
        rotation.x = normalize_angle(rotation.x - 180.0);
    } else if coords.v_tiling < 0.0 {
        scale[1] = -scale[1];
        rotation.x = normalize_angle(rotation.x + 180.0);
        rotation.z = normalize_angle(rotation.z + 180.0);
    }

    let rotation_z = normalize_angle(rotation.z);
    let rotation_z = if float_almost_equal(rotation_z, 0.0) { 0.0 } else { rotation_z };

    warn_non_uniform_rotation(scale, rotation_z, texture_name, diagnostics);

    if !float_almost_equal(normalize_angle(rotation.x), 0.0)
        || !float_almost_equal(normalize_angle(rotation.y), 0.0)
    {
        diagnostics.warn(format!(
            "Unsupported texture rotation axis found on {}. Only rotations around the Z axis can be exported to USD.",
            texture_name
        ));
    }

    TextureTransform2D {
        scale,
        rotation_degrees: rotation_z,
        translation,
        wrap_s,
        wrap_t,
    }
}

/// Non-uniform scale combined with a rotation skews in the target.
pub(crate) fn warn_non_uniform_rotation(
    scale: [f64; 2],
    rotation: f64,
    texture_name: &str,
    diagnostics: &mut Diagnostics,
) {
    if rotation != 0.0 && !float_almost_equal(scale[0], scale[1]) {
        diagnostics.warn(format!(
            "Non uniform texture scaling with an applied rotation may result in incorrect texture mapping for {}.",
            texture_name
        ));
    }
}
