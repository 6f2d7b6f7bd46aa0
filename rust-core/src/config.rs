//! Measurement configuration
//!
//! Caller-supplied settings for one acquisition/analysis cycle, with the
//! range checks that run before any register is touched.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, AnalyzerResult};

/// Highest ADC sample rate the FFT core accepts (Hz)
pub const SAMPLE_RATE_MAX: f64 = 125_000_000.0;

/// Widest analysis bandwidth the FFT core accepts (Hz)
pub const BANDWIDTH_MAX: f64 = 2_000_000.0;

pub const HARMONIC_COUNT_MIN: u8 = 1;
pub const HARMONIC_COUNT_MAX: u8 = 10;

/// Bandwidth used for THD+N when the caller asks for `auto` (Hz, before decimation).
/// Fixed by the FPGA design.
pub const BEST_BANDWIDTH_FOR_THDN: f64 = 20_000.0;

/// Register value that lets the core pick its own decimation
pub const DECIMATION_AUTO: u8 = 0xFF;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(3);

/// FFT length of the instrument variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FftSize {
    /// 8192-point FFT, 4096 bins
    Points8K,
    /// 16384-point FFT, 8192 bins
    Points16K,
}

impl FftSize {
    /// Number of points in the transform
    pub fn points(self) -> usize {
        match self {
            FftSize::Points8K => 8192,
            FftSize::Points16K => 16384,
        }
    }

    /// Number of bins in the half spectrum
    pub fn bins(self) -> usize {
        self.points() / 2
    }

    /// Bins summed on each side of a peak to capture window leakage.
    ///
    /// Empirical values matched to the core's window; not derived.
    pub fn envelope(self) -> usize {
        match self {
            FftSize::Points8K => 4,
            FftSize::Points16K => 8,
        }
    }
}

impl Default for FftSize {
    fn default() -> Self {
        FftSize::Points8K
    }
}

impl TryFrom<u32> for FftSize {
    type Error = AnalyzerError;

    fn try_from(points: u32) -> Result<Self, Self::Error> {
        match points {
            8192 => Ok(FftSize::Points8K),
            16384 => Ok(FftSize::Points16K),
            other => Err(AnalyzerError::invalid_config(format!(
                "unsupported FFT size {other}, expected 8192 or 16384"
            ))),
        }
    }
}

impl From<FftSize> for u32 {
    fn from(size: FftSize) -> Self {
        size.points() as u32
    }
}

/// Requested decimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Decimation {
    /// Let the core choose (register value 0xFF)
    Auto,
    /// Fixed divisor, 1..=254
    Fixed(u8),
}

impl Decimation {
    /// Value written to the decimation config register
    pub fn register_value(self) -> u8 {
        match self {
            Decimation::Auto => DECIMATION_AUTO,
            Decimation::Fixed(d) => d,
        }
    }
}

impl Default for Decimation {
    fn default() -> Self {
        Decimation::Auto
    }
}

impl TryFrom<u8> for Decimation {
    type Error = AnalyzerError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Err(AnalyzerError::invalid_config("decimation must be in 1..=255")),
            DECIMATION_AUTO => Ok(Decimation::Auto),
            d => Ok(Decimation::Fixed(d)),
        }
    }
}

impl From<Decimation> for u8 {
    fn from(decimation: Decimation) -> Self {
        decimation.register_value()
    }
}

/// Upper frequency limit for THD+N and noise floor summation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bandwidth {
    /// `BEST_BANDWIDTH_FOR_THDN / decimation`, capped at the spectrum end
    Auto,
    /// Explicit limit in Hz
    Hz(f64),
}

impl Default for Bandwidth {
    fn default() -> Self {
        Bandwidth::Auto
    }
}

/// Poll cadence and ceiling for the hardware handshakes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    #[serde(rename = "interval_ms", with = "millis")]
    pub interval: Duration,
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollPolicy {
    pub fn validate(&self) -> AnalyzerResult<()> {
        if self.interval.is_zero() {
            return Err(AnalyzerError::invalid_config("poll interval must be non-zero"));
        }
        if self.timeout < self.interval {
            return Err(AnalyzerError::invalid_config(
                "poll timeout must be at least one poll interval",
            ));
        }
        Ok(())
    }
}

/// Acquisition settings for one measurement cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// ADC sample rate in Hz, before decimation
    pub sample_rate: f64,

    pub decimation: Decimation,

    pub fft_size: FftSize,

    /// Number of 32-bit words to read instead of the data count register
    pub data_count_override: Option<u32>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 192_000.0,
            decimation: Decimation::Auto,
            fft_size: FftSize::Points8K,
            data_count_override: None,
        }
    }
}

impl AcquisitionConfig {
    pub fn validate(&self) -> AnalyzerResult<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 || self.sample_rate > SAMPLE_RATE_MAX
        {
            return Err(AnalyzerError::invalid_config(format!(
                "sample rate {} Hz outside (0, {SAMPLE_RATE_MAX}]",
                self.sample_rate
            )));
        }
        if let Decimation::Fixed(0) = self.decimation {
            return Err(AnalyzerError::invalid_config("decimation must be in 1..=255"));
        }
        if let Some(words) = self.data_count_override {
            let limit = self.fft_size.bins() as u32 * 2;
            if words == 0 || words > limit {
                return Err(AnalyzerError::invalid_config(format!(
                    "data count override {words} outside 1..={limit} words"
                )));
            }
        }
        Ok(())
    }

    /// Nyquist frequency of the requested (undecimated) rate
    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }
}

/// Which optional metrics to compute and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub bandwidth: Bandwidth,

    /// Harmonics (fundamental included) summed for THD; `None` skips THD
    pub harmonic_count: Option<u8>,

    /// Frequency at which to report an interpolated amplitude
    pub target_frequency: Option<f64>,

    /// Compute THD+N
    pub thdn: bool,

    /// Compute the in-band noise floor
    pub noise_floor: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bandwidth: Bandwidth::Auto,
            harmonic_count: None,
            target_frequency: None,
            thdn: true,
            noise_floor: true,
        }
    }
}

impl AnalysisConfig {
    /// Check settings against the Nyquist frequency of the acquisition
    pub fn validate(&self, nyquist: f64) -> AnalyzerResult<()> {
        if let Bandwidth::Hz(hz) = self.bandwidth {
            validate_bandwidth(hz, nyquist)?;
        }
        if let Some(count) = self.harmonic_count {
            validate_harmonic_count(count)?;
        }
        if let Some(freq) = self.target_frequency {
            validate_target_frequency(freq, nyquist)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_bandwidth(hz: f64, nyquist: f64) -> AnalyzerResult<()> {
    if !hz.is_finite() || hz < 0.0 || hz > BANDWIDTH_MAX {
        return Err(AnalyzerError::invalid_config(format!(
            "bandwidth {hz} Hz outside [0, {BANDWIDTH_MAX}]"
        )));
    }
    if hz > nyquist {
        return Err(AnalyzerError::invalid_config(format!(
            "bandwidth {hz} Hz above Nyquist {nyquist} Hz"
        )));
    }
    Ok(())
}

pub(crate) fn validate_harmonic_count(count: u8) -> AnalyzerResult<()> {
    if !(HARMONIC_COUNT_MIN..=HARMONIC_COUNT_MAX).contains(&count) {
        return Err(AnalyzerError::invalid_config(format!(
            "harmonic count {count} outside {HARMONIC_COUNT_MIN}..={HARMONIC_COUNT_MAX}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_target_frequency(freq: f64, nyquist: f64) -> AnalyzerResult<()> {
    if !freq.is_finite() || freq <= 0.0 || freq >= nyquist {
        return Err(AnalyzerError::invalid_config(format!(
            "target frequency {freq} Hz outside (0, {nyquist})"
        )));
    }
    Ok(())
}

/// Complete instrument settings, loadable from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub acquisition: AcquisitionConfig,
    pub analysis: AnalysisConfig,
    pub poll: PollPolicy,
}

impl InstrumentConfig {
    /// Parse and validate settings from a TOML document
    pub fn from_toml_str(text: &str) -> AnalyzerResult<Self> {
        let config: InstrumentConfig =
            toml::from_str(text).map_err(|e| AnalyzerError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalyzerResult<()> {
        self.acquisition.validate()?;
        self.analysis.validate(self.acquisition.nyquist())?;
        self.poll.validate()
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
