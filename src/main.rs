use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use idphoto_extract::{BatchReport, BatchRunner, ClusterMode, ExtractionConfig, PdfOpener};

#[derive(Parser)]
#[command(name = "idphoto-extract")]
#[command(about = "Extract ID photos from PDF files, numbered in reading order")]
struct Cli {
    /// Source PDF file directory
    #[arg(long, value_name = "DIR")]
    pdf_file_dir: PathBuf,

    /// Extracted pictures output directory
    #[arg(long, value_name = "DIR")]
    output_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// How coordinates are grouped into rows and columns
    #[arg(long, value_enum, default_value_t = ClusterModeArg::Chained)]
    cluster_mode: ClusterModeArg,

    /// Stop at the first PDF that cannot be parsed or decoded
    #[arg(long)]
    fail_fast: bool,

    /// Also write a JSON summary of the run to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClusterModeArg {
    /// Gap measured from the previous coordinate
    Chained,
    /// Gap measured from the first coordinate of the row or column
    Anchored,
}

impl From<ClusterModeArg> for ClusterMode {
    fn from(arg: ClusterModeArg) -> Self {
        match arg {
            ClusterModeArg::Chained => ClusterMode::Chained,
            ClusterModeArg::Anchored => ClusterMode::Anchored,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = ExtractionConfig::default().with_cluster_mode(args.cluster_mode.into());
    let runner = BatchRunner::new(PdfOpener, config).with_fail_fast(args.fail_fast);

    let result = runner.run(&args.pdf_file_dir, &args.output_dir)?;

    println!("Finished!");
    println!("Processed pdf file count: {}", result.processed);
    println!("Not processed pdf file count: {}", result.unprocessed);
    if let Some(path) = &result.missing_list {
        println!("missing_list.txt has been output into {}.", path.display());
    }

    if let Some(report_path) = &args.report {
        BatchReport::new(
            &args.pdf_file_dir,
            &args.output_dir,
            runner.pipeline().config(),
            &result,
        )
        .write(report_path)?;
        if args.verbose {
            println!("Report written to {}", report_path.display());
        }
    }

    Ok(())
}
