use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdfprep")]
#[command(about = "Split and crop a directory of numbered PDF files")]
#[command(version)]
pub struct Cli {
    /// Directory containing the batch's PDF files
    #[arg(long, default_value = "pdf")]
    pub dir: PathBuf,

    /// Skip the split stage; only crop
    #[arg(long)]
    pub nosplit: bool,

    /// Ghostscript executable used as the bounding-box oracle
    #[arg(long, default_value = "gs")]
    pub ghostscript: PathBuf,

    /// Maximum number of concurrent workers (default: available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Seconds to wait for one bounding-box computation
    #[arg(long, default_value_t = 60)]
    pub oracle_timeout: u64,
}
