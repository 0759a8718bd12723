use std::path::PathBuf;

use clap::Parser;

/// Develop every photo in SOURCE_DIR with rawtherapee-cli and move each
/// original, together with its processing profile, into DESTINATION_DIR as
/// soon as it is done.
#[derive(Parser, Debug)]
#[command(name = "rtauto", author, version, about, long_about = None)]
pub struct Args {
    /// Directory containing the photos to process
    pub source: PathBuf,

    /// Directory that receives processed photos (created if missing)
    pub destination: PathBuf,

    /// rawtherapee-cli executable to use instead of searching PATH
    #[arg(long, env = "RTAUTO_TOOL")]
    pub tool: Option<PathBuf>,

    /// Processing profile (.pp3) passed to the converter; defaults to the bundled auto-correction profile
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Delay between staging directory scans, in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Only count an output as present once it is this many milliseconds old
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Give up on photos that make no progress this long after the converter exited
    #[arg(long)]
    pub exit_grace_secs: Option<u64>,

    /// Fail instead of warning when two source files share a name
    #[arg(long)]
    pub abort_on_collision: bool,

    /// Show the converter's own output
    #[arg(long)]
    pub tool_output: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors and hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}
