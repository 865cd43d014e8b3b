use ndarray::ArrayView1;

/// Summary statistics of one power trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub mean: f32,
    pub peak: f32,
    pub energy: f32,
}

/// Extracts mean, peak and energy in one pass, accumulating left to right
/// in f32.
///
/// The running maximum starts at 0.0, so `peak` is never negative: a trace
/// that dips below zero everywhere reports `peak = 0.0`. Captured power
/// samples are physically non-negative and the recorded datasets rely on
/// this floor.
pub fn extract(trace: ArrayView1<f32>) -> Features {
    let mut sum: f32 = 0.0;
    let mut max_val: f32 = 0.0;
    let mut energy: f32 = 0.0;
    for &val in trace.iter() {
        sum += val;
        energy += val * val;
        if val > max_val {
            max_val = val;
        }
    }
    Features {
        mean: sum / trace.len() as f32,
        peak: max_val,
        energy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn constant_trace() {
        let c = 0.25f32;
        let n = 1024;
        let trace = Array1::from_elem(n, c);
        let f = extract(trace.view());
        assert_eq!(f.mean, c);
        assert_eq!(f.peak, c);
        // n * c^2 is exact in f32 for powers of two
        assert_eq!(f.energy, n as f32 * c * c);
    }

    #[test]
    fn mixed_trace() {
        let trace = Array1::from(vec![0.5f32, -0.5, 1.0, 0.0]);
        let f = extract(trace.view());
        assert!((f.mean - 0.25).abs() < 1e-6);
        assert_eq!(f.peak, 1.0);
        assert!((f.energy - 1.5).abs() < 1e-6);
    }

    #[test]
    fn all_negative_trace_has_zero_peak() {
        let trace = Array1::from(vec![-1.0f32, -0.25, -3.5]);
        let f = extract(trace.view());
        assert_eq!(f.peak, 0.0);
        assert!(f.mean < 0.0);
        assert!(f.energy > 0.0);
    }
}
