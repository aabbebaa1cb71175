// geoadjust_cli/src/main.rs

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use geoadjust_cli::cli::Cli;
use geoadjust_cli::jobs::JobFile;
use geoadjust_cli::run_job;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let job_file = JobFile::load(&cli.job)?;
    tracing::info!("loaded {} job(s) from {}", job_file.jobs.len(), cli.job.display());

    let mut failures = 0;
    for (i, job) in job_file.jobs.iter().enumerate() {
        let title = job.name().unwrap_or_else(|| job.get_type_str());
        println!("== [{}] {} ==", i + 1, title);
        match run_job(job, &job_file.settings) {
            Ok(report) => println!("{report}"),
            Err(e) => {
                failures += 1;
                tracing::error!("job {} ({}) failed: {:#}", i + 1, title, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} job(s) failed", job_file.jobs.len());
    }
    Ok(())
}
