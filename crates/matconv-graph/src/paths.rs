//! Texture file path handling.
//!
//! Paths coming from the host may use either separator style and may carry a
//! drive letter, so everything here works on strings rather than on the
//! platform's `Path`.

/// Whether `path` contains characters outside 7-bit ASCII. Such paths cannot
/// be authored as assets.
pub fn has_non_ascii(path: &str) -> bool {
    !path.is_ascii()
}

/// Convert backslashes to forward slashes.
pub fn to_posix(path: &str) -> String {
    path.replace('\\', "/")
}

fn drive(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        Some(path[..1].to_ascii_lowercase())
    } else {
        None
    }
}

/// Absolute in either the POSIX or the Windows sense.
pub fn is_absolute(path: &str) -> bool {
    let posix = to_posix(path);
    posix.starts_with('/') || (drive(&posix).is_some() && posix[2..].starts_with('/'))
}

fn components(path: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    parts
}

/// `path` relative to the directory `start`, when both are absolute and on
/// the same drive. Otherwise `path` is returned unchanged.
pub fn relative_to(path: &str, start: &str) -> String {
    if !is_absolute(path) || !is_absolute(start) {
        return path.to_string();
    }
    let path_posix = to_posix(path);
    let start_posix = to_posix(start);
    let path_drive = drive(&path_posix);
    if path_drive != drive(&start_posix) {
        return path.to_string();
    }

    let skip = if path_drive.is_some() { 2 } else { 0 };
    let target = components(&path_posix[skip..]);
    let base = components(&start_posix[skip..]);

    let same_name = |a: &str, b: &str| {
        if path_drive.is_some() {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    };
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| same_name(a, b))
        .count();

    let mut parts: Vec<&str> = vec![".."; base.len() - common];
    parts.extend(&target[common..]);
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// The asset path authored on a texture node: forward slashes, with `./`
/// in front of relative paths so they resolve against the layer.
pub fn asset_path(path: &str) -> String {
    let posix = to_posix(path);
    if is_absolute(&posix) || posix.starts_with("./") {
        posix
    } else {
        format!("./{}", posix)
    }
}

/// Directory part of a file path, or `None` for a bare file name.
pub fn parent_dir(path: &str) -> Option<String> {
    let posix = to_posix(path);
    let idx = posix.rfind('/')?;
    Some(if idx == 0 {
        "/".to_string()
    } else {
        posix[..idx].to_string()
    })
}

/// Join a relative asset path onto a directory. Absolute paths pass through.
pub fn resolve_against(dir: &str, path: &str) -> String {
    if is_absolute(path) {
        return to_posix(path);
    }
    let rel = to_posix(path);
    let rel = rel.strip_prefix("./").unwrap_or(&rel);
    format!("{}/{}", to_posix(dir).trim_end_matches('/'), rel)
}
