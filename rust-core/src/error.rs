//! Error types for acquisition and spectral analysis

use std::time::Duration;
use thiserror::Error;

/// Result type for analyzer operations
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Failure reported by a register transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Register access failed at 0x{address:02x}: {reason}")]
pub struct BusError {
    pub address: u32,
    pub reason: String,
}

impl BusError {
    pub fn new(address: u32, reason: impl Into<String>) -> Self {
        Self {
            address,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while acquiring or analyzing a spectrum
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    /// Decimation-enabled flag never came up
    #[error("Wait for decimation to settle timed out after {elapsed:?} (limit {limit:?})")]
    DecimationTimeout { elapsed: Duration, limit: Duration },

    /// FFT core stayed busy
    #[error("Wait for FFT calculation timed out after {elapsed:?} (limit {limit:?})")]
    ComputeTimeout { elapsed: Duration, limit: Duration },

    /// Hardware resolved a decimation of zero
    #[error("Hardware resolved decimation to 0")]
    ZeroDecimation,

    /// Data count register (or override) reported no bins
    #[error("FFT power data count is zero")]
    EmptySpectrum,

    /// Data count register (or override) claims more bins than the FFT produces
    #[error("FFT power data count of {bins} bins exceeds the {limit}-bin half spectrum")]
    OversizedSpectrum { bins: usize, limit: usize },

    /// Fewer than 3 bins or no power anywhere after DC removal
    #[error("Spectrum is empty or flat ({bins} bins)")]
    EmptyOrFlatSpectrum { bins: usize },

    /// Both bins of an interpolation pair carry no power
    #[error("Peak pair ({k1_index}, {k2_index}) has zero power")]
    ZeroPeakPower { k1_index: usize, k2_index: usize },

    /// Fundamental window sums to zero
    #[error("Fundamental power is zero")]
    ZeroFundamentalPower,

    /// Power ratio cannot be expressed in dB
    #[error("Logarithmic argument {ratio} is less than or equal to 0")]
    NonPositiveLogArgument { ratio: f64 },

    /// Configuration rejected before touching hardware
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Acquisition step invoked out of order
    #[error("Invalid acquisition state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    /// Software transform rejected its buffers
    #[error("FFT processing failed: {0}")]
    Transform(String),

    #[error(transparent)]
    Bus(#[from] BusError),
}

impl AnalyzerError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        AnalyzerError::InvalidConfig(reason.into())
    }

    /// Check whether re-running the whole measurement cycle may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalyzerError::DecimationTimeout { .. }
                | AnalyzerError::ComputeTimeout { .. }
                | AnalyzerError::Bus(_)
        )
    }

    /// Check whether this is one of the two handshake timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AnalyzerError::DecimationTimeout { .. } | AnalyzerError::ComputeTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        let timeout = AnalyzerError::ComputeTimeout {
            elapsed: Duration::from_secs(3),
            limit: Duration::from_secs(3),
        };
        assert!(timeout.is_recoverable());
        assert!(timeout.is_timeout());

        let bus: AnalyzerError = BusError::new(0x14, "device gone").into();
        assert!(bus.is_recoverable());
        assert!(!bus.is_timeout());

        assert!(!AnalyzerError::ZeroFundamentalPower.is_recoverable());
        assert!(!AnalyzerError::invalid_config("bad").is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = AnalyzerError::NonPositiveLogArgument { ratio: -0.5 };
        assert_eq!(
            err.to_string(),
            "Logarithmic argument -0.5 is less than or equal to 0"
        );

        let err: AnalyzerError = BusError::new(0x84, "nack").into();
        assert_eq!(err.to_string(), "Register access failed at 0x84: nack");
    }
}
