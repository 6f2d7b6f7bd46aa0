//! Python bindings for the software FFT engine

use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::FftSize;
use crate::spectrum::FftEngine;

/// Hardware-equivalent power spectra from sample blocks
#[pyclass(name = "FftEngine")]
pub struct PyFftEngine {
    engine: FftEngine,
}

#[pymethods]
impl PyFftEngine {
    /// Args:
    ///     fft_size: 8192 or 16384
    #[new]
    #[pyo3(signature = (fft_size=8192))]
    fn new(fft_size: u32) -> PyResult<Self> {
        let fft_size = FftSize::try_from(fft_size)?;
        Ok(Self {
            engine: FftEngine::new(fft_size),
        })
    }

    /// Nuttall-windowed power spectrum of one block
    ///
    /// Args:
    ///     signal: Samples as numpy array (zero-padded to the FFT size)
    ///
    /// Returns:
    ///     Half-spectrum bin powers as numpy array
    fn power_spectrum<'py>(
        &mut self,
        py: Python<'py>,
        signal: PyReadonlyArray1<f64>,
    ) -> PyResult<&'py PyArray1<f64>> {
        let samples = signal
            .as_slice()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let spectrum = self.engine.power_spectrum(samples)?;
        Ok(PyArray1::from_slice(py, spectrum.bins()))
    }

    fn get_fft_size(&self) -> usize {
        self.engine.fft_size().points()
    }
}
