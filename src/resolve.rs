use crate::formats;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Discover the files a conversion request covers.
///
/// A single file passes through after an input-format check. A directory is
/// walked (one level unless `recursive`) and filtered either to `filter`'s
/// extension or to every supported input extension. Results are sorted.
pub fn resolve_files(root: &Path, filter: Option<&str>, recursive: bool) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(anyhow!("input not found: {}", root.display()));
    }

    if root.is_file() {
        let ext = formats::normalized_extension(root).unwrap_or_default();
        if !formats::is_supported_input(&ext) {
            return Err(anyhow!("not a supported input format: {}", root.display()));
        }
        return Ok(vec![root.to_path_buf()]);
    }

    if !root.is_dir() {
        return Err(anyhow!(
            "input is neither file nor directory: {}",
            root.display()
        ));
    }

    let filter_ext = filter.map(|f| f.trim_start_matches('.').to_ascii_lowercase());

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(root).max_depth(max_depth) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let Some(ext) = formats::normalized_extension(&path) else {
            continue;
        };
        let keep = match &filter_ext {
            Some(f) => ext == *f,
            None => formats::is_supported_input(&ext),
        };
        if keep {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Group discovered files by extension, for the `list` surface.
pub fn group_by_extension(files: &[PathBuf]) -> BTreeMap<String, Vec<String>> {
    let mut by_format: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for f in files {
        let ext = formats::normalized_extension(f).unwrap_or_default();
        by_format
            .entry(ext)
            .or_default()
            .push(f.display().to_string());
    }
    by_format
}
