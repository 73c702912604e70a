use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::{SplitError, TRAIN_DIR, VAL_DIR};

/// Class list file name inside the split output directory.
pub const CLASS_LIST_FILE: &str = "classes.txt";

/// Structured manifest file name inside the split output directory.
pub const MANIFEST_FILE: &str = "data.yaml";

/// The structured description of a dataset split, consumed by downstream
/// training tools. Serialized as YAML with exactly these keys.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetManifest {
    /// Dataset root, forward slashes on every platform.
    pub path: String,
    /// Train image directory relative to `path`.
    pub train: String,
    /// Val image directory relative to `path`.
    pub val: String,
    /// Class count; always equals `names.len()`.
    pub nc: usize,
    /// Ordered class names.
    pub names: Vec<String>,
}

/// Ensure `classes.txt` exists in `output_dir`, inferring it from the split
/// label directories when absent.
///
/// Inference scans the first whitespace-delimited token (the class index) of
/// every line in every label file under `labels/train` and `labels/val`,
/// deduplicates, sorts numerically where tokens are numeric and lexically
/// otherwise, and writes one `class_<token>` name per line. Unreadable label
/// files are reported in the returned warnings and skipped.
pub fn ensure_class_list(
    output_dir: &Path,
    labels_dir: &Path,
) -> Result<(PathBuf, Vec<String>), SplitError> {
    let class_path = output_dir.join(CLASS_LIST_FILE);
    if class_path.is_file() {
        return Ok((class_path, Vec::new()));
    }

    let mut warnings = Vec::new();
    let mut tokens = HashSet::new();
    for subset in [TRAIN_DIR, VAL_DIR] {
        let dir = labels_dir.join(subset);
        if !dir.is_dir() {
            continue;
        }
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            SplitError::Manifest(format!("failed to scan {}: {e}", dir.display()))
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_label = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
            if !is_label {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    for line in content.lines() {
                        if let Some(token) = line.split_whitespace().next() {
                            tokens.insert(token.to_string());
                        }
                    }
                }
                Err(e) => warnings.push(format!(
                    "could not read label file {}: {e}",
                    path.display()
                )),
            }
        }
    }

    if tokens.is_empty() {
        return Err(SplitError::Manifest(
            "no class labels found; cannot create classes.txt".to_string(),
        ));
    }

    let mut tokens: Vec<String> = tokens.into_iter().collect();
    tokens.sort_by(|a, b| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    });

    let content: String = tokens
        .iter()
        .map(|t| format!("class_{t}\n"))
        .collect();
    std::fs::write(&class_path, content).map_err(|e| {
        SplitError::Manifest(format!("failed to write {}: {e}", class_path.display()))
    })?;
    debug!(classes = tokens.len(), path = %class_path.display(), "inferred class list");
    Ok((class_path, warnings))
}

/// Read the non-empty lines of a class list file.
pub fn read_class_list(path: &Path) -> Result<Vec<String>, SplitError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SplitError::Manifest(format!("failed to read {}: {e}", path.display())))?;
    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(SplitError::Manifest(format!(
            "{} is empty",
            path.display()
        )));
    }
    Ok(names)
}

/// Write `data.yaml` for a split dataset rooted at `output_dir`, creating
/// `classes.txt` first if needed. Returns the manifest path, its contents,
/// and any per-file warnings collected during class inference.
pub fn write_manifest(
    output_dir: &Path,
    labels_dir: &Path,
) -> Result<(PathBuf, DatasetManifest, Vec<String>), SplitError> {
    let (class_path, warnings) = ensure_class_list(output_dir, labels_dir)?;
    let names = read_class_list(&class_path)?;

    let manifest = DatasetManifest {
        path: output_dir.display().to_string().replace('\\', "/"),
        train: format!("images/{TRAIN_DIR}"),
        val: format!("images/{VAL_DIR}"),
        nc: names.len(),
        names,
    };

    let yaml = yaml_serde::to_string(&manifest)
        .map_err(|e| SplitError::Manifest(format!("failed to encode manifest: {e}")))?;
    let manifest_path = output_dir.join(MANIFEST_FILE);
    std::fs::write(&manifest_path, yaml).map_err(|e| {
        SplitError::Manifest(format!(
            "failed to write {}: {e}",
            manifest_path.display()
        ))
    })?;
    Ok((manifest_path, manifest, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_labels(labels_dir: &Path, subset: &str, files: &[(&str, &str)]) {
        let dir = labels_dir.join(subset);
        std::fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
    }

    #[test]
    fn test_infer_classes_dedupes_and_sorts_numerically() {
        let dir = tempfile::TempDir::new().unwrap();
        let labels = dir.path().join("labels");
        write_labels(&labels, TRAIN_DIR, &[
            ("a.txt", "10 0.1 0.1 0.2 0.2\n2 0.3 0.3 0.1 0.1\n"),
            ("b.txt", "0 0.5 0.5 0.1 0.1\n"),
        ]);
        write_labels(&labels, VAL_DIR, &[("c.txt", "2 0.2 0.2 0.1 0.1\n")]);

        let (path, warnings) = ensure_class_list(dir.path(), &labels).unwrap();
        assert!(warnings.is_empty());
        let names = read_class_list(&path).unwrap();
        assert_eq!(names, vec!["class_0", "class_2", "class_10"]);
    }

    #[test]
    fn test_existing_class_list_is_not_overwritten() {
        let dir = tempfile::TempDir::new().unwrap();
        let labels = dir.path().join("labels");
        write_labels(&labels, TRAIN_DIR, &[("a.txt", "0 0 0 0 0\n")]);
        std::fs::write(dir.path().join(CLASS_LIST_FILE), "person\ncar\n").unwrap();

        let (path, _) = ensure_class_list(dir.path(), &labels).unwrap();
        assert_eq!(read_class_list(&path).unwrap(), vec!["person", "car"]);
    }

    #[test]
    fn test_no_labels_means_no_class_list() {
        let dir = tempfile::TempDir::new().unwrap();
        let labels = dir.path().join("labels");
        std::fs::create_dir_all(labels.join(TRAIN_DIR)).unwrap();
        assert!(matches!(
            ensure_class_list(dir.path(), &labels),
            Err(SplitError::Manifest(_))
        ));
    }

    #[test]
    fn test_read_class_list_skips_blank_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CLASS_LIST_FILE);
        std::fs::write(&path, "cat\n\n  \ndog\n").unwrap();
        assert_eq!(read_class_list(&path).unwrap(), vec!["cat", "dog"]);
    }

    #[test]
    fn test_write_manifest_counts_match_class_list() {
        let dir = tempfile::TempDir::new().unwrap();
        let labels = dir.path().join("labels");
        write_labels(&labels, TRAIN_DIR, &[("a.txt", "0 x\n1 x\n"), ("b.txt", "2 x\n")]);

        let (manifest_path, manifest, _) = write_manifest(dir.path(), &labels).unwrap();
        assert!(manifest_path.is_file());
        assert_eq!(manifest.nc, 3);
        assert_eq!(manifest.nc, manifest.names.len());
        assert_eq!(
            manifest.nc,
            read_class_list(&dir.path().join(CLASS_LIST_FILE)).unwrap().len()
        );
        assert_eq!(manifest.train, "images/train");
        assert_eq!(manifest.val, "images/val");
        assert!(!manifest.path.contains('\\'));

        let written = std::fs::read_to_string(&manifest_path).unwrap();
        assert!(written.contains("nc: 3"));
        assert!(written.contains("class_0"));
    }

    #[test]
    fn test_write_manifest_respects_existing_class_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let labels = dir.path().join("labels");
        write_labels(&labels, TRAIN_DIR, &[("a.txt", "0 x\n")]);
        std::fs::write(dir.path().join(CLASS_LIST_FILE), "person\ncar\nbike\n").unwrap();

        let (_, manifest, _) = write_manifest(dir.path(), &labels).unwrap();
        assert_eq!(manifest.nc, 3);
        assert_eq!(manifest.names, vec!["person", "car", "bike"]);
    }
}
