// geoadjust_cli/src/lib.rs

// Command-line front end: job file parsing, dispatch into geoadjust_core,
// and report formatting.
pub mod cli;
pub mod jobs;
pub mod report;

use anyhow::{Context, Result};

use geoadjust_core::prelude::*;

use crate::jobs::Job;

/// Runs one job and returns its report.
pub fn run_job(job: &Job, config: &AdjustmentConfig) -> Result<String> {
    let inverse = InverseCascade::default();
    let mut out = String::new();

    match job {
        Job::Network(spec) => {
            let mut network = spec.build_network()?;
            let result = adjust_network_with(&mut network, &config.network, &inverse)
                .context("network adjustment failed")?;
            report::network(&mut out, &network, &result)?;
        }
        Job::Resection(spec) => {
            let result = space_resection(
                &spec.interior,
                &spec.image_points(),
                &spec.object_points(),
                &config.refinement,
                &inverse,
            )
            .context("space resection failed")?;
            report::resection(&mut out, &result)?;
        }
        Job::Intersection(spec) => {
            let result = space_intersection(&spec.image_views(), &config.refinement, &inverse)
                .context("space intersection failed")?;
            report::intersection(&mut out, &result)?;
        }
        Job::ClosedLeveling(spec) => {
            let result = closed_leveling(&spec.distances, &spec.differences, spec.start, &config.leveling)
                .context("closed leveling failed")?;
            report::leveling(&mut out, &result)?;
        }
        Job::AttachedLeveling(spec) => {
            let result = attached_leveling(
                &spec.distances,
                &spec.differences,
                spec.start,
                spec.end,
                &config.leveling,
            )
            .context("attached leveling failed")?;
            report::leveling(&mut out, &result)?;
        }
    }
    Ok(out)
}
