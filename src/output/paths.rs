//! Output path helpers

use std::path::{Path, PathBuf};

/// Returns `path` if nothing exists there, otherwise `name_N.ext`
///
/// `N` is one larger than the largest suffix already present next to
/// `path`, so earlier reports are never overwritten.
pub fn unique_output_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned());
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let prefix = format!("{}_", stem);

    let listing_dir = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    let largest = std::fs::read_dir(listing_dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| {
                    let candidate = entry.path();
                    if candidate.extension().map(|e| e.to_string_lossy().into_owned())
                        != extension
                    {
                        return None;
                    }
                    candidate
                        .file_stem()?
                        .to_str()?
                        .strip_prefix(&prefix)?
                        .parse::<u32>()
                        .ok()
                })
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);

    let file_name = match &extension {
        Some(ext) => format!("{}{}.{}", prefix, largest + 1, ext),
        None => format!("{}{}", prefix, largest + 1),
    };
    parent.join(file_name)
}
