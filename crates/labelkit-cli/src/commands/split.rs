use anyhow::{Context, Result, bail};
use colored::Colorize;
use labelkit_core::commands::split::{SplitOpts, SplitSummary};
use labelkit_core::config::DashboardConfig;
use labelkit_core::events::StatusBus;

use crate::cli::{SplitArgs, Verbosity};
use crate::render::render_events;

/// Split a dataset into train/val subsets and write its manifest.
pub async fn run(
    config: &DashboardConfig,
    args: SplitArgs,
    verbosity: Verbosity,
) -> Result<()> {
    let source = args
        .source
        .canonicalize()
        .with_context(|| format!("Source directory not found: {}", args.source.display()))?;
    let output_base = match args.output {
        Some(dir) => dir,
        None => source
            .parent()
            .context("Source directory has no parent to place the output in")?
            .to_path_buf(),
    };

    let ratio = args.ratio.unwrap_or(config.split.ratio);
    validate_ratio(ratio)?;

    let opts = SplitOpts {
        source,
        output_base,
        ratio,
        seed: args.seed,
    };

    let (bus, rx) = StatusBus::channel();
    let renderer = tokio::spawn(render_events(rx, verbosity));

    let result = labelkit_core::commands::split::run(opts, bus).await;
    let _ = renderer.await;

    match result {
        Ok(summary) => {
            print_summary(&summary, verbosity);
            Ok(())
        }
        Err(e) => bail!(e),
    }
}

fn print_summary(summary: &SplitSummary, verbosity: Verbosity) {
    if verbosity == Verbosity::Quiet {
        return;
    }
    println!(
        "\n{} {} train / {} val pairs in {}",
        "Split".green().bold(),
        summary.train,
        summary.val,
        summary.output_dir.display()
    );
    if summary.unpaired > 0 {
        println!(
            "  {} {} unlabeled image(s) left in place",
            "i".blue(),
            summary.unpaired
        );
    }
    println!("  manifest: {}", summary.manifest_path.display());
}

/// Reject obviously unusable ratios before any filesystem work happens.
pub fn validate_ratio(ratio: f64) -> Result<()> {
    if !(ratio > 0.0 && ratio < 1.0) {
        bail!("ratio must be strictly between 0 and 1, got {ratio}");
    }
    Ok(())
}
