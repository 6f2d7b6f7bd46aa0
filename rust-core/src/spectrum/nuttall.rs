//! Sub-bin interpolation for a Nuttall-windowed DFT peak
//!
//! Closed-form fit for the 4-term Nuttall window (continuous first
//! derivative). Only valid for spectra computed with that window; change
//! both together or not at all.
//!
//! ```text
//! β = (y2 − y1) / (y2 + y1)              y = √power
//! α = 2.95494514β + 0.17671943β³ + 0.09230694β⁵
//! A = (y1 + y2)(3.20976143 + 0.9187393α² + 0.14734229α⁴) / N
//! f = (0.5 + α + k1) · Fs / N
//! ```

use super::peak::PeakPair;
use crate::config::FftSize;
use crate::error::{AnalyzerError, AnalyzerResult};

const ALPHA_COEFFICIENTS: [f64; 3] = [2.95494514, 0.17671943, 0.09230694];
const AMPLITUDE_COEFFICIENTS: [f64; 3] = [3.20976143, 0.9187393, 0.14734229];

/// Offset from `k1` to the midpoint of the pair, in bins
pub const FREQUENCY_OFFSET: f64 = 0.5;

/// Interpolated position and amplitude of a peak
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NuttallCorrection {
    pub beta: f64,
    /// Offset of the true peak from the pair midpoint, in bins
    pub alpha: f64,
    /// Window-corrected amplitude
    pub amplitude: f64,
}

impl NuttallCorrection {
    pub fn from_peak(pair: &PeakPair, fft_size: FftSize) -> AnalyzerResult<Self> {
        let y1 = pair.k1_power.sqrt();
        let y2 = pair.k2_power.sqrt();
        let sum = y1 + y2;
        if sum == 0.0 {
            return Err(AnalyzerError::ZeroPeakPower {
                k1_index: pair.k1_index,
                k2_index: pair.k2_index,
            });
        }

        let beta = (y2 - y1) / sum;
        let [a1, a3, a5] = ALPHA_COEFFICIENTS;
        let alpha = a1 * beta + a3 * beta.powi(3) + a5 * beta.powi(5);

        let [c0, c2, c4] = AMPLITUDE_COEFFICIENTS;
        let gain = c0 + c2 * alpha.powi(2) + c4 * alpha.powi(4);
        let amplitude = sum * gain / fft_size.points() as f64;

        Ok(Self {
            beta,
            alpha,
            amplitude,
        })
    }

    /// Peak-to-peak amplitude
    pub fn vpp(&self, fft_size: FftSize) -> f64 {
        self.amplitude / fft_size.bins() as f64
    }

    /// Interpolated frequency given the pair's lower bin and the bin width
    pub fn frequency(&self, k1_index: usize, bin_width: f64) -> f64 {
        (FREQUENCY_OFFSET + self.alpha + k1_index as f64) * bin_width
    }
}
