use clap::Parser;
use std::path::PathBuf;

/// geoadjust: least-squares adjustment of leveling networks, leveling lines
/// and photogrammetric resection/intersection.
///
/// This struct defines the command-line arguments accepted by the
/// `geoadjust` binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the job TOML file to run.
    #[arg(short, long, default_value = "assets/jobs/example.toml")]
    pub job: PathBuf,

    /// Log every iteration and inversion stage (overridden by `RUST_LOG`).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
