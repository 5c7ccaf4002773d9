//! UDIM tile discovery.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

/// Placeholder replaced by the tile number in a UDIM file pattern.
pub const UDIM_MARKER: &str = "<UDIM>";

pub const FIRST_UDIM: u32 = 1001;
pub const LAST_UDIM: u32 = 9999;

pub fn is_udim_path(path: &str) -> bool {
    path.contains(UDIM_MARKER)
}

/// File name of one tile of `pattern`.
pub fn tile_file_name(pattern: &str, tile: u32) -> String {
    pattern.replace(UDIM_MARKER, &tile.to_string())
}

/// Every tile of `pattern` present in `dir`, in tile order (u-major rows of
/// ten, starting at 1001).
pub fn all_valid_udims(dir: &Path, pattern: &str) -> io::Result<Vec<u32>> {
    scan(dir, pattern, false)
}

/// The first tile of `pattern` in `dir`. Scanning stops at the first
/// missing tile.
pub fn first_valid_udim(dir: &Path, pattern: &str) -> io::Result<Option<u32>> {
    Ok(scan(dir, pattern, true)?.into_iter().next())
}

fn scan(dir: &Path, pattern: &str, first_only: bool) -> io::Result<Vec<u32>> {
    let names: HashSet<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();

    let mut tiles = Vec::new();
    for tile in FIRST_UDIM..=LAST_UDIM {
        if names.contains(&tile_file_name(pattern, tile)) {
            tiles.push(tile);
            if first_only {
                break;
            }
        } else if first_only {
            break;
        }
    }

    if tiles.is_empty() {
        log::warn!("No valid udim files found in \"{}\".", dir.display());
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_is_udim_path() {
        assert!(is_udim_path("maps/wood.<UDIM>.png"));
        assert!(!is_udim_path("maps/wood.1001.png"));
        assert_eq!(tile_file_name("wood.<UDIM>.png", 1012), "wood.1012.png");
    }

    #[test]
    fn test_all_valid_udims() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "wood.1001.png");
        touch(dir.path(), "wood.1002.png");
        touch(dir.path(), "wood.1011.png");
        touch(dir.path(), "other.1003.png");

        let tiles = all_valid_udims(dir.path(), "wood.<UDIM>.png").unwrap();
        assert_eq!(tiles, vec![1001, 1002, 1011]);
        assert_eq!(first_valid_udim(dir.path(), "wood.<UDIM>.png").unwrap(), Some(1001));
    }

    #[test]
    fn test_first_stops_at_gap() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "wood.1002.png");

        assert_eq!(first_valid_udim(dir.path(), "wood.<UDIM>.png").unwrap(), None);
        assert_eq!(all_valid_udims(dir.path(), "wood.<UDIM>.png").unwrap(), vec![1002]);
    }

    #[test]
    fn test_missing_dir() {
        assert!(all_valid_udims(Path::new("/nonexistent/udim/dir"), "a.<UDIM>.png").is_err());
    }
}
