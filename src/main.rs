use ndarray::Array2;
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use std::env;
use std::error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use trace_prep::pipeline::{Pipeline, SummaryBuilder};
use trace_prep::quantize::QuantProfile;
use trace_prep::read::{read_csv_dataset, read_npy_dataset, FormatTraces};
use trace_prep::report;
use trace_prep::tools::{plot_hamming, write_array};

fn power_profile(name: &str) -> Option<QuantProfile> {
    match name {
        "q2.10" => Some(QuantProfile::POWER_Q2_10),
        "q2.14" => Some(QuantProfile::POWER_Q2_14),
        "q1.15" => Some(QuantProfile::POWER_Q1_15),
        _ => None,
    }
}

fn main() -> Result<(), Box<dyn error::Error>> {
    let dataset = env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("data/Power_Trace_Train.csv"));
    let profile_name = env::args().nth(2).unwrap_or_else(|| String::from("q2.10"));
    let power = power_profile(&profile_name).ok_or_else(|| {
        format!("unknown power profile {profile_name:?} (q2.10, q2.14, q1.15)")
    })?;

    // a .csv path is the capture export; anything else is a folder of npy matrices
    let samples = if dataset.ends_with(".csv") {
        read_csv_dataset(&dataset)?
    } else {
        read_npy_dataset::<FormatTraces>(&dataset)?
    };
    if samples.is_empty() {
        return Err("empty dataset".into());
    }
    let trace_len = samples[0].trace.len();

    let pipeline = Pipeline::new(trace_len, power, QuantProfile::LEAKAGE_Q8);
    let reports = pipeline.process_batch(&samples)?;

    /* Parallel reduction of the leakage extrema; the merge keeps the
    earliest index on ties, so the combine order does not matter. */
    let summary = reports
        .par_iter()
        .fold(SummaryBuilder::new, |mut builder, report| {
            builder.update(report.index, report.hamming);
            builder
        })
        .reduce(SummaryBuilder::new, |lhs, rhs| lhs + rhs)
        .finalize()?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for report in &reports {
        report::render_sample(&mut out, report)?;
    }
    report::render_summary(&mut out, &summary)?;
    out.flush()?;

    // feature matrix for downstream analysis: mean, peak, energy, distance
    let mut features = Array2::<f32>::zeros((reports.len(), 4));
    for (row, report) in reports.iter().enumerate() {
        features[[row, 0]] = report.mean;
        features[[row, 1]] = report.peak;
        features[[row, 2]] = report.energy;
        features[[row, 3]] = report.hamming as f32;
    }
    write_array("features.npy", features.view())?;

    report::write_json(BufWriter::new(File::create("reports.json")?), &reports, &summary)?;
    plot_hamming("hamming.png", &reports)?;

    Ok(())
}
