use crate::aes;
use crate::features::{self, Features};
use crate::leakage::hamming_distance;
use crate::quantize::{self, Encoded, QuantError, QuantProfile};
use ndarray::Array1;
use rayon::prelude::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use std::error;
use std::fmt;
use std::ops::Add;

/// One captured encryption: the AES-128 inputs, the ciphertext recorded by
/// the scope, and the power trace of the operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub plaintext: [u8; 16],
    pub key: [u8; 16],
    pub ciphertext: [u8; 16],
    pub trace: Array1<f32>,
}

/// Everything extracted from one sample, in input order. A quantized field
/// is `None` when the scalar was negative and has no unsigned encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReport {
    pub index: usize,
    pub mean: f32,
    pub peak: f32,
    pub energy: f32,
    pub hamming: usize,
    pub mean_bits: Option<Encoded>,
    pub peak_bits: Option<Encoded>,
    pub energy_bits: Option<Encoded>,
    pub hamming_bits: Option<Encoded>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub min_hamming: usize,
    pub max_hamming: usize,
    pub min_index: usize,
    pub max_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Trace of the wrong length reached the pipeline.
    TraceLength {
        index: usize,
        expected: usize,
        got: usize,
    },
    /// The aggregator was asked to summarize zero reports.
    EmptyBatch,
    /// Unusable quantization profile, surfaced with the sample it hit.
    Quant { index: usize, source: QuantError },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::TraceLength {
                index,
                expected,
                got,
            } => write!(f, "sample {index}: trace of {got} samples, expected {expected}"),
            PipelineError::EmptyBatch => write!(f, "empty batch, nothing to summarize"),
            PipelineError::Quant { index, source } => write!(f, "sample {index}: {source}"),
        }
    }
}

impl error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            PipelineError::Quant { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Re-encrypts the sample and scores the result against the recorded
/// ciphertext. Zero means the capture matches the cipher exactly.
pub fn reference_distance(sample: &Sample) -> usize {
    let computed = aes::encrypt_block(&sample.key, &sample.plaintext);
    hamming_distance(&computed, &sample.ciphertext)
}

pub struct Pipeline {
    trace_len: usize,
    power_profile: QuantProfile,
    leakage_profile: QuantProfile,
}

impl Pipeline {
    pub fn new(trace_len: usize, power_profile: QuantProfile, leakage_profile: QuantProfile) -> Self {
        Self {
            trace_len,
            power_profile,
            leakage_profile,
        }
    }

    /// Runs one sample through reference check, feature extraction and
    /// quantization.
    pub fn process_sample(
        &self,
        index: usize,
        sample: &Sample,
    ) -> Result<SampleReport, PipelineError> {
        if sample.trace.len() != self.trace_len {
            return Err(PipelineError::TraceLength {
                index,
                expected: self.trace_len,
                got: sample.trace.len(),
            });
        }

        let hamming = reference_distance(sample);
        let Features { mean, peak, energy } = features::extract(sample.trace.view());

        let mean_bits = self.encode_field(index, mean, self.power_profile)?;
        let peak_bits = self.encode_field(index, peak, self.power_profile)?;
        let energy_bits = self.encode_field(index, energy, self.power_profile)?;
        let hamming_bits = self.encode_field(index, hamming as f32, self.leakage_profile)?;

        Ok(SampleReport {
            index,
            mean,
            peak,
            energy,
            hamming,
            mean_bits,
            peak_bits,
            energy_bits,
            hamming_bits,
        })
    }

    /* A negative scalar is recoverable: the field stays unencoded and the
    rest of the sample goes through. Bad profile widths abort the batch. */
    fn encode_field(
        &self,
        index: usize,
        value: f32,
        profile: QuantProfile,
    ) -> Result<Option<Encoded>, PipelineError> {
        match quantize::encode(value, profile) {
            Ok(encoded) => Ok(Some(encoded)),
            Err(QuantError::Negative(_)) => Ok(None),
            Err(source) => Err(PipelineError::Quant { index, source }),
        }
    }

    /// Maps the whole batch in parallel. Reports come back in input order.
    pub fn process_batch(&self, samples: &[Sample]) -> Result<Vec<SampleReport>, PipelineError> {
        samples
            .par_iter()
            .enumerate()
            .map(|(index, sample)| self.process_sample(index, sample))
            .collect()
    }
}

/// Running min/max of the leakage proxy. Ties keep the earliest index, so
/// merging partial builders with `+` gives the same answer as one
/// left-to-right scan regardless of combine order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryBuilder {
    state: Option<DatasetSummary>,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, index: usize, hamming: usize) {
        match &mut self.state {
            None => {
                self.state = Some(DatasetSummary {
                    min_hamming: hamming,
                    max_hamming: hamming,
                    min_index: index,
                    max_index: index,
                });
            }
            Some(s) => {
                if hamming > s.max_hamming || (hamming == s.max_hamming && index < s.max_index) {
                    s.max_hamming = hamming;
                    s.max_index = index;
                }
                if hamming < s.min_hamming || (hamming == s.min_hamming && index < s.min_index) {
                    s.min_hamming = hamming;
                    s.min_index = index;
                }
            }
        }
    }

    pub fn finalize(self) -> Result<DatasetSummary, PipelineError> {
        self.state.ok_or(PipelineError::EmptyBatch)
    }
}

impl Add for SummaryBuilder {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self::Output {
        if let Some(s) = rhs.state {
            self.update(s.max_index, s.max_hamming);
            self.update(s.min_index, s.min_hamming);
        }
        self
    }
}

/// Sequential fold over reports already in input order.
pub fn summarize(reports: &[SampleReport]) -> Result<DatasetSummary, PipelineError> {
    let mut builder = SummaryBuilder::new();
    for report in reports {
        builder.update(report.index, report.hamming);
    }
    builder.finalize()
}
