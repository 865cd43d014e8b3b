use crate::pipeline::{DatasetSummary, SampleReport};
use crate::quantize::Encoded;
use serde::Serialize;
use std::io::{self, Write};

/* Formatting only. Every value here was computed by the pipeline; this
module never touches a trace or a cipher block. */

pub fn render_sample(w: &mut impl Write, report: &SampleReport) -> io::Result<()> {
    writeln!(w, "Sample {:3}:", report.index)?;
    write_scalar(w, "Mean      ", report.mean, &report.mean_bits)?;
    write_scalar(w, "Peak      ", report.peak, &report.peak_bits)?;
    write_scalar(w, "Energy    ", report.energy, &report.energy_bits)?;
    match &report.hamming_bits {
        Some(e) => writeln!(
            w,
            "  HammingDist: {:2}       -> {} ({}-bit)",
            report.hamming,
            e.bits,
            e.bits.len()
        ),
        None => writeln!(w, "  HammingDist: {:2}       -> not representable", report.hamming),
    }
}

fn write_scalar(
    w: &mut impl Write,
    label: &str,
    value: f32,
    bits: &Option<Encoded>,
) -> io::Result<()> {
    match bits {
        Some(e) if e.saturated => {
            writeln!(w, "  {label}: {value:.6} -> {} (saturated)", e.bits)
        }
        Some(e) => writeln!(w, "  {label}: {value:.6} -> {}", e.bits),
        None => writeln!(w, "  {label}: {value:.6} -> not representable (negative)"),
    }
}

pub fn render_summary(w: &mut impl Write, summary: &DatasetSummary) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "=== Hamming Distance Summary ===")?;
    writeln!(
        w,
        "Minimum Hamming Distance: {} (Sample {})",
        summary.min_hamming, summary.min_index
    )?;
    writeln!(
        w,
        "Maximum Hamming Distance: {} (Sample {})",
        summary.max_hamming, summary.max_index
    )
}

#[derive(Serialize)]
struct Export<'a> {
    reports: &'a [SampleReport],
    summary: &'a DatasetSummary,
}

/// Machine-readable dump of the whole run.
pub fn write_json(
    w: impl Write,
    reports: &[SampleReport],
    summary: &DatasetSummary,
) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(w, &Export { reports, summary })
}
