//! Python bindings for spectrum analysis

use numpy::PyReadonlyArray1;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::acquisition::ResolvedTiming;
use crate::config::{
    validate_bandwidth, validate_harmonic_count, validate_target_frequency, AnalysisConfig,
    Bandwidth, FftSize,
};
use crate::spectrum::{PowerSpectrum, SpectralAnalyzer};

/// Spectral analyzer over power spectra supplied from Python
#[pyclass(name = "FftAnalyzer")]
pub struct PyFftAnalyzer {
    analyzer: SpectralAnalyzer,
    timing: ResolvedTiming,
}

#[pymethods]
impl PyFftAnalyzer {
    /// Create a new analyzer
    ///
    /// Args:
    ///     sample_rate: Requested sample rate in Hz
    ///     decimation: Decimation the core resolved (1..255)
    ///     fft_size: 8192 or 16384
    #[new]
    #[pyo3(signature = (sample_rate=192000.0, decimation=1, fft_size=8192))]
    fn new(sample_rate: f64, decimation: u8, fft_size: u32) -> PyResult<Self> {
        let fft_size = FftSize::try_from(fft_size)?;
        let timing = ResolvedTiming::new(sample_rate, decimation, fft_size)?;
        Ok(Self {
            analyzer: SpectralAnalyzer::new(AnalysisConfig::default()),
            timing,
        })
    }

    /// Harmonics summed for THD (1..10), or None to skip THD
    #[pyo3(signature = (count=None))]
    fn set_harmonic_count(&mut self, count: Option<u8>) -> PyResult<()> {
        if let Some(count) = count {
            validate_harmonic_count(count)?;
        }
        let mut config = self.analyzer.config().clone();
        config.harmonic_count = count;
        self.analyzer.update_config(config);
        Ok(())
    }

    /// Frequency in Hz for the interpolated amplitude, or None
    #[pyo3(signature = (frequency=None))]
    fn set_target_frequency(&mut self, frequency: Option<f64>) -> PyResult<()> {
        if let Some(frequency) = frequency {
            validate_target_frequency(frequency, self.timing.nyquist())?;
        }
        let mut config = self.analyzer.config().clone();
        config.target_frequency = frequency;
        self.analyzer.update_config(config);
        Ok(())
    }

    /// THD+N bandwidth in Hz, or None for auto
    #[pyo3(signature = (hz=None))]
    fn set_bandwidth(&mut self, hz: Option<f64>) -> PyResult<()> {
        let bandwidth = match hz {
            Some(hz) => {
                validate_bandwidth(hz, self.timing.nyquist())?;
                Bandwidth::Hz(hz)
            }
            None => Bandwidth::Auto,
        };
        let mut config = self.analyzer.config().clone();
        config.bandwidth = bandwidth;
        self.analyzer.update_config(config);
        Ok(())
    }

    /// Analyze one half-spectrum of bin powers
    ///
    /// Args:
    ///     power: Bin powers as numpy array
    ///
    /// Returns:
    ///     Dict of vpp, frequency, thd, thdn, noise_floor, vpp_at_frequency
    ///     (None when not requested or not computable) and failures
    fn analyze<'py>(
        &self,
        py: Python<'py>,
        power: PyReadonlyArray1<f64>,
    ) -> PyResult<&'py PyDict> {
        let bins = power
            .as_slice()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let spectrum = PowerSpectrum::new(bins.to_vec())?;
        let result = self.analyzer.analyze(&spectrum, &self.timing)?;

        let dict = PyDict::new(py);
        dict.set_item("vpp", result.vpp)?;
        dict.set_item("frequency", result.frequency)?;
        dict.set_item("thd", result.thd)?;
        dict.set_item("thdn", result.thdn)?;
        dict.set_item("noise_floor", result.noise_floor)?;
        dict.set_item("vpp_at_frequency", result.vpp_at_frequency)?;
        dict.set_item("k1_index", result.peak.k1_index)?;
        dict.set_item("k2_index", result.peak.k2_index)?;
        dict.set_item("bandwidth_index", result.bandwidth_index)?;

        let failures = PyDict::new(py);
        for failure in &result.failures {
            failures.set_item(failure.metric.to_string(), failure.error.to_string())?;
        }
        dict.set_item("failures", failures)?;
        Ok(dict)
    }

    /// Get frequency resolution in Hz
    fn frequency_resolution(&self) -> f64 {
        self.timing.frequency_resolution
    }

    /// Get current FFT size
    fn get_fft_size(&self) -> usize {
        self.timing.fft_size.points()
    }
}
