use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::debug;

pub mod manifest;

/// Image extensions accepted by the pairing step, lowercase, without dot.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Subset directory names created under `images/` and `labels/`.
pub const TRAIN_DIR: &str = "train";
pub const VAL_DIR: &str = "val";

/// Errors aborting a split job. Per-file move problems are not here: they
/// are tolerated and reported as warnings by the caller.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("failed to copy dataset into {dest}: {source}")]
    Copy {
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'images' or 'labels' folder not found under {0}")]
    Discovery(PathBuf),
    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no paired image/label files found")]
    NoPairs,
    #[error("failed to create {path}: {source}")]
    Subdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest failure: {0}")]
    Manifest(String),
}

/// An image file and its same-stem `.txt` label, both present in their
/// source directories at pairing time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePair {
    pub stem: String,
    /// Image extension without the dot, original casing preserved.
    pub image_ext: String,
}

impl FilePair {
    pub fn image_file_name(&self) -> String {
        format!("{}.{}", self.stem, self.image_ext)
    }

    pub fn label_file_name(&self) -> String {
        format!("{}.txt", self.stem)
    }
}

/// Recursively copy `source` into `<source-name>_done` under `output_base`.
///
/// An existing destination is merged into rather than rejected, so a
/// half-finished previous clone can be completed by running again.
pub fn clone_tree(source: &Path, output_base: &Path) -> Result<PathBuf, SplitError> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    let output_dir = output_base.join(format!("{name}_done"));

    copy_recursively(source, &output_dir).map_err(|source| SplitError::Copy {
        dest: output_dir.clone(),
        source,
    })?;
    Ok(output_dir)
}

fn copy_recursively(from: &Path, to: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_recursively(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// Breadth-first search for sibling directories literally named `images`
/// and `labels` under a common parent. Returns `None` when no parent holds
/// both.
pub fn discover_dirs(root: &Path) -> Option<(PathBuf, PathBuf)> {
    let mut queue = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        let images = dir.join("images");
        let labels = dir.join("labels");
        if images.is_dir() && labels.is_dir() {
            return Some((images, labels));
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                queue.push_back(entry.path());
            }
        }
    }
    None
}

/// Pair image files with their same-stem labels.
///
/// Returns the pairs plus the count of images that had no label counterpart;
/// those are left untouched and reported by the caller as a warning.
pub fn pair_files(
    images_dir: &Path,
    labels_dir: &Path,
) -> Result<(Vec<FilePair>, usize), SplitError> {
    let label_stems: HashSet<String> = list_files(labels_dir)?
        .into_iter()
        .filter_map(|name| {
            let path = Path::new(&name);
            match path.extension() {
                Some(ext) if ext.eq_ignore_ascii_case("txt") => {
                    path.file_stem().map(|s| s.to_string_lossy().into_owned())
                }
                _ => None,
            }
        })
        .collect();

    let mut pairs = Vec::new();
    let mut unpaired = 0usize;
    for name in list_files(images_dir)? {
        let path = Path::new(&name);
        let Some(ext) = path.extension().map(|e| e.to_string_lossy().into_owned()) else {
            continue;
        };
        if !IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        if label_stems.contains(&stem) {
            pairs.push(FilePair {
                stem,
                image_ext: ext,
            });
        } else {
            unpaired += 1;
        }
    }

    // Directory listing order is platform-dependent; sort so the shuffle is
    // the only source of nondeterminism.
    pairs.sort_by(|a, b| a.stem.cmp(&b.stem));
    Ok((pairs, unpaired))
}

/// Plain file names (not paths) of the direct children of `dir`.
fn list_files(dir: &Path) -> Result<Vec<String>, SplitError> {
    let entries = std::fs::read_dir(dir).map_err(|source| SplitError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut names = Vec::new();
    for entry in entries.flatten() {
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Shuffle the pairs and split them by ratio: the first `round(ratio·N)`
/// become the train set, the remainder the val set.
///
/// Unseeded by default; pass a seed to make membership deterministic.
pub fn split_pairs(
    mut pairs: Vec<FilePair>,
    ratio: f64,
    seed: Option<u64>,
) -> (Vec<FilePair>, Vec<FilePair>) {
    match seed {
        Some(seed) => pairs.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => pairs.shuffle(&mut rand::rng()),
    }
    let take = ((ratio * pairs.len() as f64).round() as usize).min(pairs.len());
    let val = pairs.split_off(take);
    (pairs, val)
}

/// Result of the move step.
#[derive(Debug, Default)]
pub struct MoveStats {
    pub moved: usize,
    /// Per-file problems that were tolerated, one message each.
    pub skipped: Vec<String>,
}

/// Move each pair's image and label into the subset subdirectories.
///
/// `images/{train,val}` and `labels/{train,val}` are created first. A source
/// file missing at move time (for example, moved by an earlier partial run)
/// is recorded in `skipped` and the job continues; only a failure to create
/// the subset directories aborts.
pub fn materialize(
    train: &[FilePair],
    val: &[FilePair],
    images_dir: &Path,
    labels_dir: &Path,
) -> Result<MoveStats, SplitError> {
    let mut stats = MoveStats::default();
    for (subset, pairs) in [(TRAIN_DIR, train), (VAL_DIR, val)] {
        let image_dest = images_dir.join(subset);
        let label_dest = labels_dir.join(subset);
        for dir in [&image_dest, &label_dest] {
            std::fs::create_dir_all(dir).map_err(|source| SplitError::Subdir {
                path: dir.clone(),
                source,
            })?;
        }

        for pair in pairs {
            let mut pair_moved = false;
            for (src_dir, dest_dir, file_name) in [
                (images_dir, &image_dest, pair.image_file_name()),
                (labels_dir, &label_dest, pair.label_file_name()),
            ] {
                let src = src_dir.join(&file_name);
                if !src.is_file() {
                    stats
                        .skipped
                        .push(format!("{file_name}: source missing, skipped"));
                    continue;
                }
                match std::fs::rename(&src, dest_dir.join(&file_name)) {
                    Ok(()) => pair_moved = true,
                    Err(e) => stats.skipped.push(format!("{file_name}: {e}")),
                }
            }
            if pair_moved {
                stats.moved += 1;
            }
        }
    }
    debug!(moved = stats.moved, skipped = stats.skipped.len(), "move step done");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create `count` paired image/label files in `images/` and `labels/`
    /// under `root`, plus `unpaired` label-less images.
    fn make_dataset(root: &Path, count: usize, unpaired: usize) {
        let images = root.join("images");
        let labels = root.join("labels");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::create_dir_all(&labels).unwrap();
        for i in 0..count {
            std::fs::write(images.join(format!("img{i:03}.jpg")), b"jpg").unwrap();
            std::fs::write(labels.join(format!("img{i:03}.txt")), format!("{} 0.5 0.5 0.1 0.1\n", i % 3))
                .unwrap();
        }
        for i in 0..unpaired {
            std::fs::write(images.join(format!("lonely{i}.png")), b"png").unwrap();
        }
    }

    // -- clone_tree --

    #[test]
    fn test_clone_tree_copies_into_done_sibling() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("set");
        make_dataset(&source, 2, 0);

        let out = clone_tree(&source, dir.path()).unwrap();
        assert!(out.ends_with("set_done"));
        assert!(out.join("images").join("img000.jpg").is_file());
        assert!(out.join("labels").join("img001.txt").is_file());
        // Source untouched.
        assert!(source.join("images").join("img000.jpg").is_file());
    }

    #[test]
    fn test_clone_tree_merges_into_existing_destination() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("set");
        make_dataset(&source, 1, 0);

        let dest = dir.path().join("set_done");
        std::fs::create_dir_all(dest.join("images")).unwrap();
        std::fs::write(dest.join("images").join("previous.jpg"), b"old").unwrap();

        let out = clone_tree(&source, dir.path()).unwrap();
        assert!(out.join("images").join("previous.jpg").is_file());
        assert!(out.join("images").join("img000.jpg").is_file());
    }

    // -- discover_dirs --

    #[test]
    fn test_discover_dirs_finds_nested_siblings() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(nested.join("images")).unwrap();
        std::fs::create_dir_all(nested.join("labels")).unwrap();

        let (images, labels) = discover_dirs(dir.path()).unwrap();
        assert_eq!(images, nested.join("images"));
        assert_eq!(labels, nested.join("labels"));
    }

    #[test]
    fn test_discover_dirs_requires_common_parent() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a").join("images")).unwrap();
        std::fs::create_dir_all(dir.path().join("b").join("labels")).unwrap();
        assert!(discover_dirs(dir.path()).is_none());
    }

    #[test]
    fn test_discover_dirs_missing_labels_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        assert!(discover_dirs(dir.path()).is_none());
    }

    // -- pair_files --

    #[test]
    fn test_pair_files_counts_unpaired_and_pairs() {
        let dir = tempfile::TempDir::new().unwrap();
        make_dataset(dir.path(), 4, 3);

        let (pairs, unpaired) =
            pair_files(&dir.path().join("images"), &dir.path().join("labels")).unwrap();
        assert_eq!(pairs.len(), 4);
        assert_eq!(unpaired, 3);
        // paired + unpaired accounts for every accepted image scanned
        assert_eq!(pairs.len() + unpaired, 7);
    }

    #[test]
    fn test_pair_files_ignores_unaccepted_extensions() {
        let dir = tempfile::TempDir::new().unwrap();
        make_dataset(dir.path(), 1, 0);
        std::fs::write(dir.path().join("images").join("img000.bmp"), b"x").unwrap();
        std::fs::write(dir.path().join("images").join("notes.md"), b"x").unwrap();

        let (pairs, unpaired) =
            pair_files(&dir.path().join("images"), &dir.path().join("labels")).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(unpaired, 0);
    }

    #[test]
    fn test_pair_files_accepts_uppercase_extensions() {
        let dir = tempfile::TempDir::new().unwrap();
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::create_dir_all(&labels).unwrap();
        std::fs::write(images.join("shot.JPG"), b"x").unwrap();
        std::fs::write(labels.join("shot.txt"), b"0 0 0 0 0").unwrap();

        let (pairs, _) = pair_files(&images, &labels).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].image_file_name(), "shot.JPG");
        assert_eq!(pairs[0].label_file_name(), "shot.txt");
    }

    #[test]
    fn test_pair_files_missing_dir_is_scan_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = pair_files(&dir.path().join("nope"), &dir.path().join("labels")).unwrap_err();
        assert!(matches!(err, SplitError::Scan { .. }));
    }

    // -- split_pairs --

    fn n_pairs(n: usize) -> Vec<FilePair> {
        (0..n)
            .map(|i| FilePair {
                stem: format!("img{i:03}"),
                image_ext: "jpg".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_split_sizes_follow_rounded_ratio() {
        for (n, ratio, want_train) in [(10, 0.7, 7), (3, 0.5, 2), (1, 0.7, 1), (0, 0.7, 0), (5, 0.9, 5)] {
            let (train, val) = split_pairs(n_pairs(n), ratio, Some(42));
            assert_eq!(train.len(), want_train, "n={n} ratio={ratio}");
            assert_eq!(train.len() + val.len(), n);
        }
    }

    #[test]
    fn test_split_partitions_without_overlap_or_loss() {
        let pairs = n_pairs(20);
        let original: HashSet<FilePair> = pairs.iter().cloned().collect();
        let (train, val) = split_pairs(pairs, 0.7, None);

        let train_set: HashSet<FilePair> = train.into_iter().collect();
        let val_set: HashSet<FilePair> = val.into_iter().collect();
        assert!(train_set.is_disjoint(&val_set));
        let union: HashSet<FilePair> = train_set.union(&val_set).cloned().collect();
        assert_eq!(union, original);
    }

    #[test]
    fn test_split_with_seed_is_deterministic() {
        let (train_a, val_a) = split_pairs(n_pairs(12), 0.7, Some(7));
        let (train_b, val_b) = split_pairs(n_pairs(12), 0.7, Some(7));
        assert_eq!(train_a, train_b);
        assert_eq!(val_a, val_b);
    }

    // -- materialize --

    #[test]
    fn test_materialize_moves_pairs_into_subsets() {
        let dir = tempfile::TempDir::new().unwrap();
        make_dataset(dir.path(), 10, 0);
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");

        let (pairs, _) = pair_files(&images, &labels).unwrap();
        let (train, val) = split_pairs(pairs, 0.7, Some(1));
        let stats = materialize(&train, &val, &images, &labels).unwrap();

        assert_eq!(stats.moved, 10);
        assert!(stats.skipped.is_empty());
        assert_eq!(std::fs::read_dir(images.join(TRAIN_DIR)).unwrap().count(), 7);
        assert_eq!(std::fs::read_dir(images.join(VAL_DIR)).unwrap().count(), 3);
        assert_eq!(std::fs::read_dir(labels.join(TRAIN_DIR)).unwrap().count(), 7);
        assert_eq!(std::fs::read_dir(labels.join(VAL_DIR)).unwrap().count(), 3);
        // Sources are gone: only the subset dirs remain.
        let remaining: Vec<_> = std::fs::read_dir(&images)
            .unwrap()
            .flatten()
            .filter(|e| e.file_type().unwrap().is_file())
            .collect();
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_materialize_second_run_skips_already_moved_files() {
        let dir = tempfile::TempDir::new().unwrap();
        make_dataset(dir.path(), 4, 0);
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");

        let (pairs, _) = pair_files(&images, &labels).unwrap();
        let (train, val) = split_pairs(pairs, 0.5, Some(3));
        materialize(&train, &val, &images, &labels).unwrap();

        // Second run over the same sets: every source is already gone.
        let stats = materialize(&train, &val, &images, &labels).unwrap();
        assert_eq!(stats.moved, 0);
        assert_eq!(stats.skipped.len(), 8);
        assert_eq!(std::fs::read_dir(images.join(TRAIN_DIR)).unwrap().count(), 2);
    }
}
