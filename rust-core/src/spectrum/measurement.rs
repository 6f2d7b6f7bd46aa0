//! Measurement record returned by the spectral analyzer

use std::fmt;

use tracing::warn;

use super::peak::PeakPair;
use crate::error::AnalyzerError;

/// Optional metrics that can fail independently of Vpp/frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Thd,
    Thdn,
    NoiseFloor,
    VppAtFrequency,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Thd => "THD",
            Metric::Thdn => "THD+N",
            Metric::NoiseFloor => "noise floor",
            Metric::VppAtFrequency => "Vpp at frequency",
        };
        f.write_str(name)
    }
}

/// Why a requested metric is absent
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFailure {
    pub metric: Metric,
    pub error: AnalyzerError,
}

/// Result of one analysis pass
///
/// Optional metrics are `None` when not requested or when they failed;
/// failures are listed in `failures`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementResult {
    /// Peak-to-peak amplitude of the fundamental
    pub vpp: f64,

    /// Interpolated fundamental frequency (Hz)
    pub frequency: f64,

    /// Total harmonic distortion (dB)
    pub thd: Option<f64>,

    /// THD plus noise (dB)
    pub thdn: Option<f64>,

    /// In-band RMS noise floor
    pub noise_floor: Option<f64>,

    /// Interpolated Vpp at the requested target frequency
    pub vpp_at_frequency: Option<f64>,

    /// Bins the fundamental was interpolated from
    pub peak: PeakPair,

    /// Exclusive upper bin used for THD+N and noise floor sums
    pub bandwidth_index: usize,

    pub failures: Vec<MetricFailure>,
}

impl MeasurementResult {
    pub(crate) fn new(vpp: f64, frequency: f64, peak: PeakPair, bandwidth_index: usize) -> Self {
        Self {
            vpp,
            frequency,
            thd: None,
            thdn: None,
            noise_floor: None,
            vpp_at_frequency: None,
            peak,
            bandwidth_index,
            failures: Vec::new(),
        }
    }

    /// Store a metric's value or its failure
    pub(crate) fn record(&mut self, metric: Metric, outcome: Result<f64, AnalyzerError>) {
        match outcome {
            Ok(value) => {
                let slot = match metric {
                    Metric::Thd => &mut self.thd,
                    Metric::Thdn => &mut self.thdn,
                    Metric::NoiseFloor => &mut self.noise_floor,
                    Metric::VppAtFrequency => &mut self.vpp_at_frequency,
                };
                *slot = Some(value);
            }
            Err(error) => {
                warn!(%metric, %error, "metric unavailable");
                self.failures.push(MetricFailure { metric, error });
            }
        }
    }

    /// Error that prevented `metric`, if any
    pub fn failure(&self, metric: Metric) -> Option<&AnalyzerError> {
        self.failures
            .iter()
            .find(|f| f.metric == metric)
            .map(|f| &f.error)
    }

    /// True when every requested metric was computed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> MeasurementResult {
        let peak = PeakPair {
            k1_index: 10,
            k1_power: 1.0,
            k2_index: 11,
            k2_power: 1.0,
        };
        MeasurementResult::new(1.0, 1000.0, peak, 853)
    }

    #[test]
    fn test_record_success_and_failure() {
        let mut result = empty();
        result.record(Metric::Thdn, Ok(-80.0));
        result.record(Metric::Thd, Err(AnalyzerError::ZeroFundamentalPower));

        assert_eq!(result.thdn, Some(-80.0));
        assert_eq!(result.thd, None);
        assert_eq!(
            result.failure(Metric::Thd),
            Some(&AnalyzerError::ZeroFundamentalPower)
        );
        assert_eq!(result.failure(Metric::Thdn), None);
        assert!(!result.is_complete());
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(Metric::Thdn.to_string(), "THD+N");
        assert_eq!(Metric::VppAtFrequency.to_string(), "Vpp at frequency");
    }
}
