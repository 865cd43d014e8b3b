use crate::pipeline::SampleReport;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array2, ArrayView2};
use ndarray_npy::{ReadNpyExt, ReadableElement, WriteNpyExt};
use plotters::prelude::*;
use std::io::BufWriter;
use std::num::ParseIntError;
use std::{error, fs::File, time::Duration};

pub fn read_array_2_from_npy_file<T: ReadableElement>(
    dir: &str,
) -> Result<Array2<T>, Box<dyn error::Error>> {
    let reader: File = File::open(dir)?;
    let arr: Array2<T> = Array2::<T>::read_npy(reader)?;
    Ok(arr)
}

pub fn write_array(dir: &str, ar: ArrayView2<f32>) -> Result<(), Box<dyn error::Error>> {
    let writer = BufWriter::new(File::create(dir)?);
    ar.write_npy(writer)?;
    Ok(())
}

/// Creates a [`ProgressBar`] with a predefined default style.
pub fn progress_bar(len: usize) -> ProgressBar {
    let progress_bar = ProgressBar::new(len as u64).with_style(
        ProgressStyle::with_template("{elapsed_precise} {wide_bar} {pos}/{len} ({eta})").unwrap(),
    );
    progress_bar.enable_steady_tick(Duration::new(0, 100000000));
    progress_bar
}

/// Parses a contiguous hex string into bytes.
pub fn read_hex(s: &str) -> Result<Vec<u8>, ParseIntError> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16))
        .collect()
}

/// Draws the hamming distance of every sample as one curve over the batch.
pub fn plot_hamming(dir: &str, reports: &[SampleReport]) -> Result<(), Box<dyn error::Error>> {
    let root = BitMapBackend::new(dir, (1024, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_hd = reports.iter().map(|r| r.hamming).max().unwrap_or(0) as i32;
    let mut chart = ChartBuilder::on(&root)
        .caption("Hamming distance per sample", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(0i32..reports.len() as i32, 0i32..max_hd + 1)?;
    chart.configure_mesh().draw()?;
    chart.draw_series(LineSeries::new(
        reports.iter().map(|r| (r.index as i32, r.hamming as i32)),
        &RED,
    ))?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_hex_round_trip() {
        assert_eq!(
            read_hex("00ff10a5").unwrap(),
            vec![0x00, 0xff, 0x10, 0xa5]
        );
        assert!(read_hex("zz").is_err());
    }
}
