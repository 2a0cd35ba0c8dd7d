use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use haploh_depths::summary::{summarize, write_table};
use haploh_depths::{init_tracing, EventCatalog, EventSource, SampleTemplate, DEFAULT_OUTPUT_DIR};

#[derive(Parser, Debug)]
#[command(
    name = "haploh-median-depths",
    version,
    about = "Median same-sample and other-sample depths per haplohseq event"
)]
struct Cli {
    /// Event file glob ('*' marks the sample id), or one event file with --sample-id.
    events: String,

    /// Owning sample of every event when EVENTS is a single file.
    #[arg(long)]
    sample_id: Option<String>,

    /// Directory holding the depth files written by haploh-vcf-depths.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    depths_dir: PathBuf,

    /// Log every loaded event.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let source = match cli.sample_id {
        Some(sample_id) => EventSource::File {
            sample_id,
            path: PathBuf::from(&cli.events),
        },
        None => EventSource::Glob(
            SampleTemplate::parse(cli.events.as_str())
                .with_context(|| format!("invalid event glob '{}'", cli.events))?,
        ),
    };

    let catalog = EventCatalog::load(&source).context("failed to load events")?;
    let summaries = summarize(&catalog, &cli.depths_dir).with_context(|| {
        format!("failed to read depths from {}", cli.depths_dir.display())
    })?;

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    write_table(&mut writer, &summaries).context("failed to write summary table")?;
    Ok(())
}
