//! Import direction: `UsdTransform2d` values back to UberBitmap parameters.

use glam::{DMat2, DVec2};
use matconv_core::{
    float_almost_equal, safe_div, Diagnostics, Transform2dParams, UberBitmapPlacement,
};

use crate::wrap::procedural_wrap_from_tokens;

/// Build UberBitmap parameters reproducing a network texture transform.
///
/// Rotation is applied around the origin with a +W axis. A uniform scale is
/// carried by `scale` with unit tiling; a non-uniform scale moves into
/// `tiling` with a unit `scale`.
pub fn uberbitmap_from_transform2d(
    params: &Transform2dParams,
    texture_name: &str,
    diagnostics: &mut Diagnostics,
) -> UberBitmapPlacement {
    let mut placement = UberBitmapPlacement {
        wrap_mode: procedural_wrap_from_tokens(
            params.wrap_s.as_deref(),
            params.wrap_t.as_deref(),
            texture_name,
            diagnostics,
        ),
        ..Default::default()
    };

    let mut offset = match params.translation {
        Some([tu, tv]) => DVec2::new(-tu, -tv),
        None => DVec2::ZERO,
    };

    let rotation = params.rotation.unwrap_or(0.0);
    if !float_almost_equal(rotation, 0.0) {
        placement.rotate = rotation;
        placement.rot_axis = [0.0, 0.0, 1.0];
        placement.rot_center = [0.0, 0.0, 0.0];
        offset = DMat2::from_angle((-rotation).to_radians()) * offset;
    }

    if let Some([su, sv]) = params.scale {
        offset = DVec2::new(safe_div(offset.x, su), safe_div(offset.y, sv));
        if su == sv {
            placement.tiling = [1.0, 1.0, 1.0];
            placement.scale = safe_div(1.0, su);
        } else {
            if placement.rotate != 0.0 {
                diagnostics.warn(format!(
                    "Non uniform texture scaling with an applied rotation may result in incorrect texture mapping for {}.",
                    texture_name
                ));
            }
            placement.scale = 1.0;
            placement.tiling = [
                if su != 0.0 { su } else { f64::INFINITY },
                if sv != 0.0 { sv } else { f64::INFINITY },
                1.0,
            ];
        }
    }

    placement.offset = [offset.x, offset.y, 0.0];
    placement
}
