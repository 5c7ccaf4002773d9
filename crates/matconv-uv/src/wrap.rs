//! Wrap-mode correspondence between source texture nodes and `UsdUVTexture`.

use matconv_core::{Diagnostics, ProceduralWrapMode, UvwCoordinates, WrapMode};

/// Per-axis wrap of a classic bitmap. Mirror wins over tile; neither is black.
pub fn bitmap_wrap(tile: bool, mirror: bool) -> WrapMode {
    if mirror {
        WrapMode::Mirror
    } else if tile {
        WrapMode::Repeat
    } else {
        WrapMode::Black
    }
}

pub fn bitmap_wrap_modes(coords: &UvwCoordinates) -> (WrapMode, WrapMode) {
    (
        bitmap_wrap(coords.u_tile, coords.u_mirror),
        bitmap_wrap(coords.v_tile, coords.v_mirror),
    )
}

/// Inverse of [`bitmap_wrap`]: the `(tile, mirror)` flags for a target mode.
/// Clamping has no bitmap equivalent and falls back to black.
pub fn bitmap_wrap_flags(mode: WrapMode, diagnostics: &mut Diagnostics) -> (bool, bool) {
    match mode {
        WrapMode::Repeat => (true, false),
        WrapMode::Mirror => (false, true),
        WrapMode::Black => (false, false),
        WrapMode::Clamp => {
            diagnostics.warn("Wrap mode \"clamp\" cannot be expressed on a classic bitmap. Using \"black\" instead.");
            (false, false)
        }
    }
}

/// Wrap of the OSL bitmap shaders. The same token drives both axes.
pub fn procedural_wrap(mode: ProceduralWrapMode, diagnostics: &mut Diagnostics) -> WrapMode {
    match mode {
        ProceduralWrapMode::Periodic => WrapMode::Repeat,
        ProceduralWrapMode::Mirror => WrapMode::Mirror,
        ProceduralWrapMode::Clamp => WrapMode::Clamp,
        // "default" means whatever the renderer does, which shows as black in the viewport.
        ProceduralWrapMode::Black | ProceduralWrapMode::Default => WrapMode::Black,
        ProceduralWrapMode::UseMetadata => {
            diagnostics.warn("No support for wrap mode \"useMetadata\". Using \"black\" instead.");
            WrapMode::Black
        }
    }
}

/// Procedural wrap mode for a pair of `wrapS`/`wrapT` tokens read from a
/// shading network. Only one mode can be kept, so differing axes fall back
/// to periodic.
pub fn procedural_wrap_from_tokens(
    wrap_s: Option<&str>,
    wrap_t: Option<&str>,
    texture_name: &str,
    diagnostics: &mut Diagnostics,
) -> ProceduralWrapMode {
    if let (Some(s), Some(t)) = (wrap_s, wrap_t) {
        if s != t {
            diagnostics.warn(format!(
                "No support for differing wrap modes, defined in wrapS and wrapT as defined in {}. Setting value to \"periodic\" for import.",
                texture_name
            ));
            return ProceduralWrapMode::Periodic;
        }
    }

    match wrap_s.or(wrap_t) {
        None => ProceduralWrapMode::Periodic,
        Some("black") => ProceduralWrapMode::Black,
        Some("clamp") => ProceduralWrapMode::Clamp,
        Some("repeat") => ProceduralWrapMode::Periodic,
        Some("mirror") => ProceduralWrapMode::Mirror,
        Some(other) => {
            diagnostics.warn(format!(
                "No support for wrap mode \"{}\" found in {}. Setting value to \"periodic\" for import.",
                other, texture_name
            ));
            ProceduralWrapMode::Periodic
        }
    }
}
