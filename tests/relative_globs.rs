mod common;

use std::env;

use common::{depth_file, stacked_scenario};
use haploh_depths::{pipeline, EventSource, RunConfig, SampleTemplate};

// The only test in this binary: it changes the process working directory.
#[test]
fn dot_relative_templates_run_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    stacked_scenario(root.path());
    env::set_current_dir(root.path()).unwrap();

    let events = EventSource::Glob(SampleTemplate::parse("./events/*.tsv").unwrap());
    let config = RunConfig::default().with_output_dir("./Depths");
    let summary = pipeline::run(&config, &events, "./calls/*.vcf").unwrap();

    assert_eq!(summary.sources, 2);
    let out = root.path().join("Depths");
    assert_eq!(
        depth_file(&out, "S1", "chr1", 1000, 2000, "same").as_deref(),
        Some("10\n")
    );
    assert_eq!(
        depth_file(&out, "S1", "chr1", 1500, 2500, "others").as_deref(),
        Some("20\n")
    );
}
