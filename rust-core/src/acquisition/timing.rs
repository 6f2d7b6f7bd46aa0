//! Sample timing resolved from the hardware's decimation choice

use crate::config::FftSize;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::spectrum::PowerSpectrum;

/// Timing of one acquisition after the core picked its decimation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTiming {
    /// Rate the caller asked for, before decimation (Hz)
    pub requested_sample_rate: f64,

    /// Decimation actually in effect (never 0)
    pub decimation: u8,

    /// `requested_sample_rate / decimation` (Hz)
    pub effective_sample_rate: f64,

    /// Width of one bin (Hz)
    pub frequency_resolution: f64,

    pub fft_size: FftSize,
}

impl ResolvedTiming {
    pub fn new(requested_sample_rate: f64, decimation: u8, fft_size: FftSize) -> AnalyzerResult<Self> {
        if decimation == 0 {
            return Err(AnalyzerError::ZeroDecimation);
        }
        if !requested_sample_rate.is_finite() || requested_sample_rate <= 0.0 {
            return Err(AnalyzerError::invalid_config(format!(
                "sample rate {requested_sample_rate} Hz must be positive"
            )));
        }

        let decimation_f = decimation as f64;
        let points = fft_size.points() as f64;
        Ok(Self {
            requested_sample_rate,
            decimation,
            effective_sample_rate: requested_sample_rate / decimation_f,
            frequency_resolution: requested_sample_rate / (points * decimation_f),
            fft_size,
        })
    }

    /// Nyquist frequency after decimation
    pub fn nyquist(&self) -> f64 {
        self.effective_sample_rate / 2.0
    }

    /// Centre frequency of bin `index`
    pub fn bin_frequency(&self, index: usize) -> f64 {
        index as f64 * self.frequency_resolution
    }
}

/// Output of one completed acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub spectrum: PowerSpectrum,
    pub timing: ResolvedTiming,
}
