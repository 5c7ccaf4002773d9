//! Texture transform resolution.
//!
//! This crate turns the placement parameters of a source texture node into
//! the scale / rotation / translation and wrap tokens of a `UsdTransform2d`
//! plus `UsdUVTexture` pair, and back again for import:
//! - Coordinate-matrix dialect (classic bitmap coordinates)
//! - Procedural dialect (OSL UberBitmap, simple OSL bitmap)
//! - Wrap-mode correspondence in both directions
//! - Inverse mapping of a network transform onto UberBitmap parameters

pub mod inverse;
pub mod matrix;
pub mod procedural;
pub mod wrap;

pub use inverse::uberbitmap_from_transform2d;
pub use matrix::{decompose_affine, decompose_bitmap, uvw_transform, EulerDecomposition};
pub use procedural::{decompose_oslbitmap, decompose_uberbitmap};
pub use wrap::{
    bitmap_wrap, bitmap_wrap_flags, bitmap_wrap_modes, procedural_wrap,
    procedural_wrap_from_tokens,
};

use matconv_core::{Diagnostics, SourcePlacement, TextureTransform2D, Transform2dParams, WrapMode};

/// A resolved transform and the warnings raised while resolving it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub transform: TextureTransform2D,
    pub diagnostics: Diagnostics,
}

/// Resolve any supported placement into a target transform.
///
/// Never fails: unsupported combinations degrade to the closest expressible
/// transform and leave a warning behind.
pub fn decompose(placement: &SourcePlacement, texture_name: &str) -> Decomposition {
    let mut diagnostics = Diagnostics::new();
    let transform = match placement {
        SourcePlacement::None => TextureTransform2D::default(),
        SourcePlacement::Bitmap(coords) => decompose_bitmap(coords, texture_name, &mut diagnostics),
        SourcePlacement::UberBitmap(uber) => {
            decompose_uberbitmap(uber, texture_name, &mut diagnostics)
        }
        SourcePlacement::OslBitmap(osl) => decompose_oslbitmap(osl, &mut diagnostics),
        SourcePlacement::Transform2d(params) => {
            passthrough_transform2d(params, texture_name, &mut diagnostics)
        }
    };
    Decomposition {
        transform,
        diagnostics,
    }
}

/// A placement read from a network is already in target space.
fn passthrough_transform2d(
    params: &Transform2dParams,
    texture_name: &str,
    diagnostics: &mut Diagnostics,
) -> TextureTransform2D {
    let mut wrap = |token: Option<&str>| match token {
        None => WrapMode::Repeat,
        Some(t) => WrapMode::from_token(t).unwrap_or_else(|| {
            diagnostics.warn(format!(
                "Unsupported wrap mode \"{}\" on {}. Using \"repeat\" instead.",
                t, texture_name
            ));
            WrapMode::Repeat
        }),
    };
    let wrap_s = wrap(params.wrap_s.as_deref());
    let wrap_t = wrap(params.wrap_t.as_deref());

    TextureTransform2D {
        scale: params.scale.unwrap_or([1.0, 1.0]),
        rotation_degrees: params.rotation.unwrap_or(0.0),
        translation: params.translation.unwrap_or([0.0, 0.0]),
        wrap_s,
        wrap_t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matconv_core::{UberBitmapPlacement, UvwCoordinates};

    #[test]
    fn test_decompose_dispatch() {
        let d = decompose(&SourcePlacement::None, "none");
        assert!(d.transform.is_identity());
        assert!(d.diagnostics.is_empty());

        let coords = UvwCoordinates::default().with_tiling(-0.5, 0.2);
        let d = decompose(&SourcePlacement::Bitmap(coords), "bitmap");
        assert!((d.transform.scale[0] + 0.5).abs() < 1e-9);
        assert!((d.transform.translation[0] - 0.75).abs() < 1e-9);

        let uber = UberBitmapPlacement {
            scale: 15.0,
            ..Default::default()
        };
        let d = decompose(&SourcePlacement::UberBitmap(uber), "uber");
        assert!((d.transform.scale[0] - 1.0 / 15.0).abs() < 1e-12);
        assert!(!d.transform.has_translation());
        assert!(!d.transform.has_rotation());
    }

    #[test]
    fn test_passthrough_wraps() {
        let params = Transform2dParams {
            rotation: Some(10.0),
            wrap_s: Some("clamp".into()),
            wrap_t: Some("useMetadata".into()),
            ..Default::default()
        };
        let d = decompose(&SourcePlacement::Transform2d(params), "tex");
        assert_eq!(d.transform.rotation_degrees, 10.0);
        assert_eq!(d.transform.wrap_s, WrapMode::Clamp);
        assert_eq!(d.transform.wrap_t, WrapMode::Repeat);
        assert_eq!(d.diagnostics.warning_count(), 1);
    }
}
