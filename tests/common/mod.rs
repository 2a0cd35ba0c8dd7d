#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("HAPLOH_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set HAPLOH_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Single-sample VCF text with one data line per `(chrom, pos, depth)`.
pub fn vcf_text(sample: &str, calls: &[(&str, u64, u64)]) -> String {
    let mut text = String::from("##fileformat=VCFv4.2\n");
    text.push_str(&format!(
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t{}\n",
        sample
    ));
    for (chrom, pos, depth) in calls {
        text.push_str(&format!(
            "{}\t{}\t.\tA\tG\t50\tPASS\t.\tGT:AD:DP\t0/1:3,3:{}\n",
            chrom, pos, depth
        ));
    }
    text
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, contents).expect("write test file");
}

/// Event file with a header row followed by `(chrom, begin, end)` rows.
pub fn events_text(rows: &[(&str, u64, u64)]) -> String {
    let mut text = String::from("CHROM\tBEGIN\tEND\tNUM_INFORMATIVE_MARKERS\n");
    for (chrom, begin, end) in rows {
        text.push_str(&format!("{}\t{}\t{}\t5\n", chrom, begin, end));
    }
    text
}

/// Contents of a depth file, `None` if it was never created.
pub fn depth_file(
    dir: &Path,
    sample: &str,
    chrom: &str,
    begin: u64,
    end: u64,
    class: &str,
) -> Option<String> {
    let path = dir.join(format!(
        "depths-{}-{}-{}-{}-{}.txt",
        sample, chrom, begin, end, class
    ));
    fs::read_to_string(path).ok()
}

/// Lay out the two-event, two-sample scenario under `root` and return
/// `(event glob, vcf glob)`.
pub fn stacked_scenario(root: &Path) -> (String, String) {
    write_file(
        &root.join("events").join("S1.tsv"),
        &events_text(&[("chr1", 1000, 2000), ("chr1", 1500, 2500)]),
    );
    write_file(
        &root.join("calls").join("S1.vcf"),
        &vcf_text("S1", &[("chr1", 1200, 10)]),
    );
    write_file(
        &root.join("calls").join("S2.vcf"),
        &vcf_text("S2", &[("chr1", 1800, 20), ("chr1", 2600, 5)]),
    );
    (
        format!("{}/events/*.tsv", root.display()),
        format!("{}/calls/*.vcf", root.display()),
    )
}
