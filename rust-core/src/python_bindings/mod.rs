//! PyO3 bindings for Python integration

use pyo3::exceptions::{PyRuntimeError, PyTimeoutError, PyValueError};
use pyo3::prelude::*;

use crate::error::AnalyzerError;

mod analyzer_bindings;
mod engine_bindings;

impl From<AnalyzerError> for PyErr {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::InvalidConfig(_) => PyValueError::new_err(err.to_string()),
            AnalyzerError::DecimationTimeout { .. } | AnalyzerError::ComputeTimeout { .. } => {
                PyTimeoutError::new_err(err.to_string())
            }
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

/// Python module definition
#[pymodule]
fn fft_analyzer(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<analyzer_bindings::PyFftAnalyzer>()?;
    m.add_class::<engine_bindings::PyFftEngine>()?;
    Ok(())
}
