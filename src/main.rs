mod cli;
mod error;
mod oracle;
mod pdf;
mod pool;
mod stages;
mod stem;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use oracle::Oracle;
use stages::{catalog, commit, crop, split};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let start = Instant::now();
    let jobs = cli.jobs.unwrap_or_else(pool::default_jobs);

    let catalog = catalog::scan(&cli.dir, jobs).await?;
    for failure in &catalog.failures {
        warn!(
            "{}: {}, excluded from this run",
            failure.name, failure.error
        );
    }
    let mut cropped = catalog.cropped_set();

    if !cli.nosplit {
        let plans: Vec<split::SplitPlan> = catalog
            .stem_groups()
            .iter()
            .filter_map(|group| split::plan(group, &cropped))
            .collect();
        // Renumbered targets will hold freshly written pages; their old
        // markers no longer describe the content.
        for plan in &plans {
            for name in &plan.invalidated {
                cropped.remove(name);
            }
        }
        if plans.is_empty() {
            info!("No stems need splitting");
        } else {
            info!("Splitting {} stems", plans.len());
            let written = split::execute(&cli.dir, plans, jobs).await;
            let promoted = commit::commit(&cli.dir, commit::SPLIT_SUFFIX)?;
            info!("Split stage staged {} pages, committed {}", written, promoted);
        }
    }

    let targets = crop::plan(&cli.dir, &cropped)?;
    if targets.is_empty() {
        info!("Nothing to crop");
    } else {
        info!("Cropping {} files", targets.len());
        let oracle = Oracle::new(
            cli.ghostscript.clone(),
            Duration::from_secs(cli.oracle_timeout),
        );
        let stats = crop::execute(&cli.dir, targets, &oracle, jobs).await;
        let promoted = commit::commit(&cli.dir, commit::CROP_SUFFIX)?;
        info!(
            "Crop stage: {} cropped ({} committed), {} skipped, {} failed",
            stats.cropped, promoted, stats.skipped, stats.failed
        );
    }

    info!("Finished in {:.2?}", start.elapsed());
    Ok(())
}
