use crate::pipeline::Sample;
use crate::tools::{progress_bar, read_array_2_from_npy_file};
use indicatif::ProgressIterator;
use ndarray::{Array1, Array2};
use ndarray_npy::ReadableElement;
use num_traits::AsPrimitive;
use std::error;

// traces format
pub type FormatTraces = f32;
pub type FormatMetadata = u8;

const BLOCK_BYTES: usize = 16;
// plaintext, ciphertext, key columns precede the trace
const META_FIELDS: usize = 3 * BLOCK_BYTES;

/// Reads a capture CSV: one header line, then per row 16 hex plaintext
/// bytes, 16 hex ciphertext bytes, 16 hex key bytes and the float trace
/// samples. The trace length is taken from the first row; any row that
/// deviates is rejected with its index, never zero-filled.
pub fn read_csv_dataset(path: &str) -> Result<Vec<Sample>, Box<dyn error::Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    parse_records(&mut reader)
}

fn parse_records<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
) -> Result<Vec<Sample>, Box<dyn error::Error>> {
    let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;

    let mut samples: Vec<Sample> = Vec::with_capacity(records.len());
    let mut trace_len: Option<usize> = None;
    let bar = progress_bar(records.len());
    for (row, record) in records.iter().enumerate().progress_with(bar) {
        if record.len() <= META_FIELDS {
            return Err(format!(
                "row {row}: {} fields, need {} metadata columns plus the trace",
                record.len(),
                META_FIELDS
            )
            .into());
        }

        let plaintext = parse_block(record, 0, row)?;
        let ciphertext = parse_block(record, BLOCK_BYTES, row)?;
        let key = parse_block(record, 2 * BLOCK_BYTES, row)?;

        let got = record.len() - META_FIELDS;
        let expected = *trace_len.get_or_insert(got);
        if got != expected {
            return Err(format!("row {row}: {got} trace samples, expected {expected}").into());
        }

        let mut trace = Vec::with_capacity(expected);
        for (i, field) in record.iter().skip(META_FIELDS).enumerate() {
            let value: f32 = fast_float::parse(field.trim())
                .map_err(|_| format!("row {row}: bad trace sample {i}: {field:?}"))?;
            trace.push(value);
        }

        samples.push(Sample {
            plaintext,
            key,
            ciphertext,
            trace: Array1::from(trace),
        });
    }
    Ok(samples)
}

fn parse_block(
    record: &csv::StringRecord,
    offset: usize,
    row: usize,
) -> Result<[u8; BLOCK_BYTES], Box<dyn error::Error>> {
    let mut block = [0u8; BLOCK_BYTES];
    for (i, byte) in block.iter_mut().enumerate() {
        let field = record
            .get(offset + i)
            .ok_or_else(|| format!("row {row}: missing byte column {}", offset + i))?;
        *byte = u8::from_str_radix(field.trim(), 16)
            .map_err(|e| format!("row {row}: bad hex byte {field:?}: {e}"))?;
    }
    Ok(block)
}

/// Reads a dataset stored as npy matrices: `plaintexts.npy`,
/// `ciphertexts.npy` and `keys.npy` with 16 columns each, `traces.npy` with
/// one trace per row in any element type convertible to f32.
pub fn read_npy_dataset<T>(folder: &str) -> Result<Vec<Sample>, Box<dyn error::Error>>
where
    T: ReadableElement + AsPrimitive<f32>,
{
    let traces: Array2<T> = read_array_2_from_npy_file(&format!("{folder}/traces.npy"))?;
    let plaintexts: Array2<FormatMetadata> =
        read_array_2_from_npy_file(&format!("{folder}/plaintexts.npy"))?;
    let ciphertexts: Array2<FormatMetadata> =
        read_array_2_from_npy_file(&format!("{folder}/ciphertexts.npy"))?;
    let keys: Array2<FormatMetadata> = read_array_2_from_npy_file(&format!("{folder}/keys.npy"))?;

    let rows = traces.shape()[0];
    for (name, arr) in [
        ("plaintexts", &plaintexts),
        ("ciphertexts", &ciphertexts),
        ("keys", &keys),
    ] {
        if arr.shape() != [rows, BLOCK_BYTES] {
            return Err(format!(
                "{name}.npy has shape {:?}, expected [{rows}, {BLOCK_BYTES}]",
                arr.shape()
            )
            .into());
        }
    }

    let mut samples = Vec::with_capacity(rows);
    for row in 0..rows {
        samples.push(Sample {
            plaintext: block_row(&plaintexts, row),
            key: block_row(&keys, row),
            ciphertext: block_row(&ciphertexts, row),
            trace: traces.row(row).map(|v| v.as_()),
        });
    }
    Ok(samples)
}

fn block_row(arr: &Array2<u8>, row: usize) -> [u8; BLOCK_BYTES] {
    let mut block = [0u8; BLOCK_BYTES];
    for (i, byte) in block.iter_mut().enumerate() {
        *byte = arr[[row, i]];
    }
    block
}
