use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use haploh_depths::{
    init_tracing, pipeline, DepthPolicy, DepthsError, EventSource, ExitCategory,
    ReadFailurePolicy, RunConfig, SampleTemplate, DEFAULT_DECOMPRESSOR, DEFAULT_OUTPUT_DIR,
    DEFAULT_QUARANTINE_DIR,
};
use tracing::error;

const AFTER_HELP: &str = "\
VCF and event filenames must contain the sample-id. The glob patterns must
contain a '*' where the sample-id appears and must be enclosed in quotes.

E.g. for files like combined-NWD294426-ad.vcf.xz, glob = 'combined-*-ad.vcf.xz'.";

#[derive(Parser, Debug)]
#[command(
    name = "haploh-vcf-depths",
    version,
    about = "Attribute VCF sequencing depths to haplohseq events",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Either `<event-glob> <vcf-glob>` or `<sample-id> <event-file> <vcf-glob>`.
    #[arg(num_args = 2..=3, required = true, value_name = "INPUTS")]
    inputs: Vec<String>,

    /// Directory receiving the depth files.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// What to do when a VCF fails part way through.
    #[arg(long, value_enum, default_value_t = OnReadError::Abort)]
    on_read_error: OnReadError,

    /// Directory receiving quarantined VCF files.
    #[arg(long, default_value = DEFAULT_QUARANTINE_DIR)]
    quarantine_dir: PathBuf,

    /// Handling of depths above 65535.
    #[arg(long, value_enum, default_value_t = DepthOverflow::Reject)]
    depth_overflow: DepthOverflow,

    /// Program used to decompress `.xz` files.
    #[arg(long, default_value = DEFAULT_DECOMPRESSOR)]
    decompressor: String,

    /// Log every event and depth file.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OnReadError {
    /// Stop the run.
    Abort,
    /// Move the file aside and continue.
    Quarantine,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DepthOverflow {
    /// Fail with a data error.
    Reject,
    /// Clamp to 65535.
    Saturate,
    /// Record the full value.
    Widen,
}

impl From<DepthOverflow> for DepthPolicy {
    fn from(value: DepthOverflow) -> Self {
        match value {
            DepthOverflow::Reject => DepthPolicy::Reject,
            DepthOverflow::Saturate => DepthPolicy::Saturate,
            DepthOverflow::Widen => DepthPolicy::Widen,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(ExitCategory::Usage.code())
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::from(err.category().code())
        }
    }
}

fn run(cli: Cli) -> Result<(), DepthsError> {
    let (events, vcf_pattern) = match cli.inputs.as_slice() {
        [event_glob, vcf_glob] => (
            EventSource::Glob(SampleTemplate::parse(event_glob.as_str())?),
            vcf_glob,
        ),
        [sample_id, event_file, vcf_glob] => (
            EventSource::File {
                sample_id: sample_id.clone(),
                path: PathBuf::from(event_file),
            },
            vcf_glob,
        ),
        _ => unreachable!("clap enforces two or three inputs"),
    };

    let read_failure = match cli.on_read_error {
        OnReadError::Abort => ReadFailurePolicy::Abort,
        OnReadError::Quarantine => ReadFailurePolicy::Quarantine {
            dir: cli.quarantine_dir,
        },
    };
    let config = RunConfig::default()
        .with_output_dir(cli.output_dir)
        .with_read_failure(read_failure)
        .with_depth_policy(cli.depth_overflow.into())
        .with_decompressor(cli.decompressor);

    let summary = pipeline::run(&config, &events, vcf_pattern)?;
    eprintln!(
        "{} events, {} VCF files, {} depths in {} files",
        summary.events, summary.sources, summary.values, summary.files
    );
    for path in &summary.quarantined {
        eprintln!("quarantined {}", path.display());
    }
    Ok(())
}
