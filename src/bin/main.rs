use std::time::Instant;

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rust_vcf_decode::reader::VcfRecords;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: vcf-decode <path.vcf>")?;

    let now = Instant::now();
    let records = VcfRecords::from_path(&path)?;
    info!(
        samples = %records.header().samples().iter().join(","),
        annotations = %records.decoder().annotations().fields().join(","),
        "decoding {}",
        path
    );

    let mut n_records = 0usize;
    let mut n_issues = 0usize;
    for decoded in records {
        let decoded = decoded?;
        let record = &decoded.record;
        for issue in &decoded.issues {
            warn!(chrom = %record.chrom(), pos = record.pos(), "{}", issue);
        }
        n_issues += decoded.issues.len();
        n_records += 1;
        println!("{:?}", record);
    }
    info!(n_records, n_issues, elapsed = ?now.elapsed(), "done");

    Ok(())
}
