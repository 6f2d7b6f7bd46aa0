//! Software FFT engine using realfft for real-valued signals
//!
//! Produces power spectra scaled the way the hardware core reports them,
//! so recorded or synthetic signals can be fed through the same analyzer
//! (and through the simulated core) without a device attached.

use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use super::power::PowerSpectrum;
use super::window::{generate_window, WindowType};
use crate::config::FftSize;
use crate::error::{AnalyzerError, AnalyzerResult};

/// FFT engine for real-valued signals
pub struct FftEngine {
    fft_size: FftSize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f64>>,

    /// Precomputed window coefficients
    window: Vec<f64>,

    /// Reusable input buffer
    input_buffer: Vec<f64>,

    /// Reusable output buffer (complex spectrum)
    output_buffer: Vec<Complex<f64>>,
}

impl FftEngine {
    /// Create an engine using the Nuttall window
    pub fn new(fft_size: FftSize) -> Self {
        Self::with_window(fft_size, WindowType::Nuttall)
    }

    /// Create an engine with an explicit window
    ///
    /// # Arguments
    /// * `fft_size` - Transform length
    /// * `window_type` - Window applied to every frame
    pub fn with_window(fft_size: FftSize, window_type: WindowType) -> Self {
        let points = fft_size.points();
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(points);

        let input_buffer = r2c.make_input_vec();
        let output_buffer = r2c.make_output_vec();

        Self {
            fft_size,
            r2c,
            window: generate_window(window_type, points),
            input_buffer,
            output_buffer,
        }
    }

    pub fn fft_size(&self) -> FftSize {
        self.fft_size
    }

    /// Compute the half-spectrum power of one frame
    ///
    /// # Arguments
    /// * `signal` - Input samples (zero-padded or truncated to the FFT size)
    ///
    /// # Returns
    /// `(N·|X[k]|)²` for k = 0..N/2, the core's fixed-point power scaling
    pub fn power_spectrum(&mut self, signal: &[f64]) -> AnalyzerResult<PowerSpectrum> {
        let points = self.fft_size.points();
        let copy_len = signal.len().min(points);

        for (slot, (&sample, &w)) in self
            .input_buffer
            .iter_mut()
            .zip(signal[..copy_len].iter().zip(&self.window))
        {
            *slot = sample * w;
        }
        self.input_buffer[copy_len..].fill(0.0);

        self.r2c
            .process(&mut self.input_buffer, &mut self.output_buffer)
            .map_err(|e| AnalyzerError::Transform(e.to_string()))?;

        let scale = points as f64;
        let bins = self.output_buffer[..self.fft_size.bins()]
            .iter()
            .map(|c| {
                let magnitude = scale * c.norm();
                magnitude * magnitude
            })
            .collect();
        PowerSpectrum::new(bins)
    }

    /// Power spectrum rounded to the integers the core's data port carries
    pub fn raw_power(&mut self, signal: &[f64]) -> AnalyzerResult<Vec<u64>> {
        let spectrum = self.power_spectrum(signal)?;
        Ok(spectrum
            .bins()
            .iter()
            .map(|&p| p.round() as u64)
            .collect())
    }
}

/// One sinusoidal component of a synthetic test signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Hz
    pub frequency: f64,
    /// Peak amplitude (half of Vpp)
    pub amplitude: f64,
}

impl Tone {
    pub fn new(frequency: f64, amplitude: f64) -> Self {
        Self {
            frequency,
            amplitude,
        }
    }
}

/// Sum of cosines sampled at `sample_rate`
pub fn synthesize_tones(sample_rate: f64, length: usize, tones: &[Tone]) -> Vec<f64> {
    (0..length)
        .map(|n| {
            let t = n as f64 / sample_rate;
            tones
                .iter()
                .map(|tone| tone.amplitude * (2.0 * PI * tone.frequency * t).cos())
                .sum()
        })
        .collect()
}
