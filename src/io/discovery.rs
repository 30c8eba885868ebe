use super::readers::format_tag;
use crate::{constants::SOURCE_EXTENSIONS, utils::util::Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Source files directly inside `dir`, grouped by format in the order of
/// [`SOURCE_EXTENSIONS`] and sorted by file name within each group.
/// Gzipped variants (`a.csv.gz`) belong to the group of their inner format.
pub fn find_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|error| {
        crate::tabmerge_error!("Failed to list directory {}: {error}", dir.display())
    })?;

    let mut groups: Vec<Vec<PathBuf>> = vec![Vec::new(); SOURCE_EXTENSIONS.len()];
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let (extension, _) = format_tag(&path);
        if let Some(group) = SOURCE_EXTENSIONS.iter().position(|&e| e == extension) {
            groups[group].push(path);
        }
    }

    for group in groups.iter_mut() {
        group.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }
    let files: Vec<PathBuf> = groups.into_iter().flatten().collect();
    log::debug!("Found {} source files in {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|path| path.file_name().expect("file name").to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn grouped_by_format_then_name() {
        let temp_dir = tempfile::tempdir().expect("temp dir should be created");
        for name in [
            "z.xml", "b.json", "b.csv", "a.csv.gz", "notes.txt", "a.json", "c.CSV",
        ] {
            fs::write(temp_dir.path().join(name), "").expect("fixture");
        }
        fs::create_dir(temp_dir.path().join("d.csv")).expect("directory named like a source");

        let files = find_source_files(temp_dir.path()).expect("listing");
        assert_eq!(
            names(&files),
            vec!["a.csv.gz", "b.csv", "c.CSV", "a.json", "b.json", "z.xml"]
        );
    }

    #[test]
    fn empty_directory() {
        let temp_dir = tempfile::tempdir().expect("temp dir should be created");
        assert!(find_source_files(temp_dir.path()).expect("listing").is_empty());
    }

    #[test]
    fn missing_directory() {
        let temp_dir = tempfile::tempdir().expect("temp dir should be created");
        let error = find_source_files(&temp_dir.path().join("missing"))
            .expect_err("directory does not exist");
        assert!(error.to_string().contains("Failed to list directory"));
    }
}
