use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::dataset::{self, SplitError, manifest};
use crate::events::{Event, StatusBus};

/// Nominal step count for progress reporting: clone, pair, split, move,
/// manifest.
pub const TOTAL_STEPS: usize = 5;

/// One dataset split request.
#[derive(Debug, Clone)]
pub struct SplitOpts {
    /// Source dataset root containing `images/` and `labels/` somewhere
    /// beneath it.
    pub source: PathBuf,
    /// Directory the `<source-name>_done` clone is created under.
    pub output_base: PathBuf,
    /// Fraction of pairs assigned to train, in (0, 1).
    pub ratio: f64,
    /// Shuffle seed; `None` keeps the split nondeterministic.
    pub seed: Option<u64>,
}

/// What a finished split produced, for frontends and tests.
#[derive(Debug)]
pub struct SplitSummary {
    pub output_dir: PathBuf,
    pub train: usize,
    pub val: usize,
    pub unpaired: usize,
    pub manifest_path: PathBuf,
}

/// Run one split job start to finish, reporting progress through the bus.
///
/// The filesystem work runs on a blocking worker so the caller's runtime
/// stays responsive.
pub async fn run(opts: SplitOpts, bus: StatusBus) -> Result<SplitSummary> {
    let worker_bus = bus.clone();
    let result = tokio::task::spawn_blocking(move || run_job(&opts, &worker_bus))
        .await
        .context("split worker panicked")?;
    bus.emit(Event::TaskFinished {
        name: "split".to_string(),
        success: result.is_ok(),
    });
    result.map_err(Into::into)
}

fn progress(bus: &StatusBus, completed: usize, message: &str) {
    bus.emit(Event::Progress {
        completed,
        total: TOTAL_STEPS,
        message: message.to_string(),
    });
}

fn run_job(opts: &SplitOpts, bus: &StatusBus) -> Result<SplitSummary, SplitError> {
    bus.emit(Event::TaskStarted {
        name: "split".to_string(),
    });
    progress(bus, 0, "starting");

    bus.status(format!("Cloning {}", opts.source.display()));
    let output_dir = match dataset::clone_tree(&opts.source, &opts.output_base) {
        Ok(dir) => dir,
        Err(e) => {
            bus.error(format!("Dataset copy failed: {e}"));
            return Err(e);
        }
    };
    progress(bus, 1, "clone complete");
    bus.status("Clone complete");

    let Some((images_dir, labels_dir)) = dataset::discover_dirs(&output_dir) else {
        let err = SplitError::Discovery(output_dir.clone());
        bus.error("'images' or 'labels' folders not found".to_string());
        return Err(err);
    };

    let (pairs, unpaired) = match dataset::pair_files(&images_dir, &labels_dir) {
        Ok(result) => result,
        Err(e) => {
            bus.error(e.to_string());
            return Err(e);
        }
    };
    if unpaired > 0 {
        bus.warning(format!(
            "{unpaired} image(s) have no matching label and were skipped"
        ));
    }
    if pairs.is_empty() {
        bus.error("No labeled images found, nothing to split".to_string());
        return Err(SplitError::NoPairs);
    }
    progress(bus, 2, "pairing complete");

    let total = pairs.len();
    let (train, val) = dataset::split_pairs(pairs, opts.ratio, opts.seed);
    info!(total, train = train.len(), val = val.len(), "split computed");
    progress(bus, 3, "split computed");

    let stats = match dataset::materialize(&train, &val, &images_dir, &labels_dir) {
        Ok(stats) => stats,
        Err(e) => {
            bus.error(e.to_string());
            return Err(e);
        }
    };
    for skip in &stats.skipped {
        bus.warning(format!("Move skipped: {skip}"));
    }
    bus.status(format!(
        "Split done: {} train / {} val",
        train.len(),
        val.len()
    ));
    progress(bus, 4, "files moved");

    let (manifest_path, manifest, warnings) =
        match manifest::write_manifest(&output_dir, &labels_dir) {
            Ok(result) => result,
            Err(e) => {
                bus.error(e.to_string());
                return Err(e);
            }
        };
    for warning in warnings {
        bus.warning(warning);
    }
    bus.status(format!(
        "Manifest written: {} ({} classes)",
        manifest_path.display(),
        manifest.nc
    ));
    progress(bus, 5, "manifest written");

    Ok(SplitSummary {
        output_dir,
        train: train.len(),
        val: val.len(),
        unpaired,
        manifest_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use std::path::Path;

    fn make_dataset(root: &Path, count: usize, unpaired: usize) {
        let images = root.join("images");
        let labels = root.join("labels");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::create_dir_all(&labels).unwrap();
        for i in 0..count {
            std::fs::write(images.join(format!("img{i:03}.jpg")), b"jpg").unwrap();
            std::fs::write(
                labels.join(format!("img{i:03}.txt")),
                format!("{} 0.5 0.5 0.1 0.1\n", i % 3),
            )
            .unwrap();
        }
        for i in 0..unpaired {
            std::fs::write(images.join(format!("lonely{i}.png")), b"png").unwrap();
        }
    }

    #[tokio::test]
    async fn test_split_ten_pairs_at_seventy_percent() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("set");
        make_dataset(&source, 10, 0);
        let (bus, _rx) = StatusBus::channel();

        let opts = SplitOpts {
            source,
            output_base: dir.path().to_path_buf(),
            ratio: 0.7,
            seed: Some(11),
        };
        let summary = run(opts, bus).await.unwrap();

        assert_eq!(summary.train, 7);
        assert_eq!(summary.val, 3);
        assert_eq!(summary.unpaired, 0);
        assert!(summary.manifest_path.is_file());

        let manifest = std::fs::read_to_string(&summary.manifest_path).unwrap();
        // img labels cycle through 3 distinct classes
        assert!(manifest.contains("nc: 3"));
        assert!(summary.output_dir.join("classes.txt").is_file());
        assert_eq!(
            std::fs::read_dir(summary.output_dir.join("images").join("train"))
                .unwrap()
                .count(),
            7
        );
    }

    #[tokio::test]
    async fn test_missing_labels_dir_aborts_without_moves() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("set");
        std::fs::create_dir_all(source.join("images")).unwrap();
        std::fs::write(source.join("images").join("a.jpg"), b"x").unwrap();
        let (bus, mut rx) = StatusBus::channel();

        let opts = SplitOpts {
            source: source.clone(),
            output_base: dir.path().to_path_buf(),
            ratio: 0.7,
            seed: None,
        };
        let err = run(opts, bus).await.unwrap_err();
        assert!(err.downcast_ref::<SplitError>().is_some());

        let mut errors = 0;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev, Event::Error(_)) {
                errors += 1;
            }
        }
        assert_eq!(errors, 1);
        // The clone happened, but nothing inside it was reorganized.
        let clone = dir.path().join("set_done");
        assert!(clone.join("images").join("a.jpg").is_file());
        assert!(!clone.join("images").join("train").exists());
    }

    #[tokio::test]
    async fn test_unpaired_images_warned_and_left_in_place() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("set");
        make_dataset(&source, 4, 2);
        let (bus, mut rx) = StatusBus::channel();

        let opts = SplitOpts {
            source,
            output_base: dir.path().to_path_buf(),
            ratio: 0.5,
            seed: Some(5),
        };
        let summary = run(opts, bus).await.unwrap();
        assert_eq!(summary.unpaired, 2);

        let mut warned = false;
        while let Ok(ev) = rx.try_recv() {
            if let Event::Warning(w) = ev
                && w.contains("2 image(s)")
            {
                warned = true;
            }
        }
        assert!(warned);
        // Unpaired images stay in the images root, not in any subset.
        let images = summary.output_dir.join("images");
        assert!(images.join("lonely0.png").is_file());
        assert!(images.join("lonely1.png").is_file());
    }

    #[tokio::test]
    async fn test_empty_dataset_reports_no_pairs() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("set");
        std::fs::create_dir_all(source.join("images")).unwrap();
        std::fs::create_dir_all(source.join("labels")).unwrap();
        let (bus, _rx) = StatusBus::channel();

        let opts = SplitOpts {
            source,
            output_base: dir.path().to_path_buf(),
            ratio: 0.7,
            seed: None,
        };
        let err = run(opts, bus).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SplitError>(),
            Some(SplitError::NoPairs)
        ));
    }

    #[tokio::test]
    async fn test_progress_reaches_five_of_five() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("set");
        make_dataset(&source, 2, 0);
        let (bus, mut rx) = StatusBus::channel();

        let opts = SplitOpts {
            source,
            output_base: dir.path().to_path_buf(),
            ratio: 0.5,
            seed: Some(1),
        };
        run(opts, bus).await.unwrap();

        let mut last = None;
        while let Ok(ev) = rx.try_recv() {
            if let Event::Progress { completed, total, .. } = ev {
                assert_eq!(total, TOTAL_STEPS);
                last = Some(completed);
            }
        }
        assert_eq!(last, Some(TOTAL_STEPS));
    }
}
