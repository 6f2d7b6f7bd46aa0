//! Spectral analyzer
//!
//! Turns one acquired power spectrum into Vpp, frequency, THD, THD+N,
//! noise floor and amplitude at a target frequency. Pure computation:
//! the same spectrum and settings always give the same result.

use tracing::info;

use super::measurement::{MeasurementResult, Metric};
use super::nuttall::NuttallCorrection;
use super::peak::PeakPair;
use super::power::PowerSpectrum;
use crate::acquisition::ResolvedTiming;
use crate::config::{
    validate_harmonic_count, AnalysisConfig, Bandwidth, FftSize, BEST_BANDWIDTH_FOR_THDN,
};
use crate::error::{AnalyzerError, AnalyzerResult};

/// First bin included in in-band power sums (skips residual DC leakage)
pub const POWER_SUM_START: usize = 8;

/// Ties the core's fixed-point power scaling to volts RMS
pub const NOISE_FLOOR_COEFFICIENT: f64 = 2.02376242639988;

/// Power ratios are expressed as 10·log10
const DB_PER_DECADE: f64 = 10.0;

/// Spectral analyzer holding the per-measurement analysis settings
#[derive(Debug, Clone, Default)]
pub struct SpectralAnalyzer {
    config: AnalysisConfig,
}

impl SpectralAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: AnalysisConfig) {
        self.config = config;
    }

    /// Analyze one spectrum
    ///
    /// Fails only when no fundamental can be found; optional metrics that
    /// cannot be computed are reported in `MeasurementResult::failures`.
    pub fn analyze(
        &self,
        spectrum: &PowerSpectrum,
        timing: &ResolvedTiming,
    ) -> AnalyzerResult<MeasurementResult> {
        let fft_size = timing.fft_size;
        let spectrum = spectrum.without_dc();

        let peak = PeakPair::locate(&spectrum)?;
        let correction = NuttallCorrection::from_peak(&peak, fft_size)?;
        let vpp = correction.vpp(fft_size);
        let frequency = correction.frequency(
            peak.k1_index,
            timing.effective_sample_rate / fft_size.points() as f64,
        );

        let bandwidth_index = bandwidth_index(self.config.bandwidth, timing);
        let mut result = MeasurementResult::new(vpp, frequency, peak, bandwidth_index);

        if self.config.thdn {
            result.record(
                Metric::Thdn,
                thdn(&spectrum, &peak, bandwidth_index, fft_size),
            );
        }

        if let Some(count) = self.config.harmonic_count {
            result.record(Metric::Thd, thd(&spectrum, frequency, count, timing));
        }

        if self.config.noise_floor {
            result.record(
                Metric::NoiseFloor,
                Ok(noise_floor(&spectrum, bandwidth_index, fft_size)),
            );
        }

        if let Some(target) = self.config.target_frequency {
            result.record(
                Metric::VppAtFrequency,
                vpp_at_frequency(&spectrum, target, timing),
            );
        }

        info!(
            vpp = result.vpp,
            frequency = result.frequency,
            thd = ?result.thd,
            thdn = ?result.thdn,
            failures = result.failures.len(),
            "spectrum analyzed"
        );
        Ok(result)
    }
}

/// Exclusive upper bin for THD+N and noise floor sums
///
/// `auto` uses `BEST_BANDWIDTH_FOR_THDN / decimation`; either way the
/// index never exceeds the half-spectrum length.
pub fn bandwidth_index(bandwidth: Bandwidth, timing: &ResolvedTiming) -> usize {
    let limit = timing.fft_size.bins();
    let hz = match bandwidth {
        Bandwidth::Auto => BEST_BANDWIDTH_FOR_THDN / timing.decimation as f64,
        Bandwidth::Hz(hz) => hz,
    };
    let index = (hz / timing.frequency_resolution).round();
    if index.is_nan() || index <= 0.0 {
        return 0;
    }
    (index as usize).min(limit)
}

/// THD+N in dB: everything in band except the fundamental, over the fundamental
///
/// `spectrum` must already have its DC bins removed.
pub fn thdn(
    spectrum: &PowerSpectrum,
    peak: &PeakPair,
    bandwidth_index: usize,
    fft_size: FftSize,
) -> AnalyzerResult<f64> {
    let envelope = fft_size.envelope();
    let fundamental =
        spectrum.band_power(peak.k1_index.saturating_sub(envelope)..peak.k2_index + envelope);
    if fundamental == 0.0 {
        return Err(AnalyzerError::ZeroFundamentalPower);
    }

    let total = spectrum.band_power(POWER_SUM_START..bandwidth_index);
    power_ratio_db((total - fundamental) / fundamental)
}

/// THD in dB over the first `harmonic_count` harmonics (fundamental included)
///
/// `spectrum` must already have its DC bins removed.
pub fn thd(
    spectrum: &PowerSpectrum,
    frequency: f64,
    harmonic_count: u8,
    timing: &ResolvedTiming,
) -> AnalyzerResult<f64> {
    validate_harmonic_count(harmonic_count)?;
    let envelope = timing.fft_size.envelope();

    let harmonic_power: Vec<f64> = (1..=harmonic_count)
        .map(|h| {
            let position = (h as f64 * frequency / timing.frequency_resolution).max(0.0);
            let center = position.floor() as usize;
            spectrum.band_power(center.saturating_sub(envelope)..center + 1 + envelope)
        })
        .collect();

    let fundamental = harmonic_power[0];
    if fundamental == 0.0 {
        return Err(AnalyzerError::ZeroFundamentalPower);
    }

    let total: f64 = harmonic_power.iter().sum();
    power_ratio_db((total - fundamental) / fundamental)
}

/// RMS of all in-band power, in volts
///
/// `spectrum` must already have its DC bins removed.
pub fn noise_floor(spectrum: &PowerSpectrum, bandwidth_index: usize, fft_size: FftSize) -> f64 {
    let rms_power = spectrum
        .band_power(POWER_SUM_START..bandwidth_index)
        .sqrt();
    rms_power / fft_size.points() as f64 / fft_size.bins() as f64 / std::f64::consts::SQRT_2
        * NOISE_FLOOR_COEFFICIENT
}

/// Interpolated Vpp of the two bins around `target` Hz
///
/// `spectrum` must already have its DC bins removed.
pub fn vpp_at_frequency(
    spectrum: &PowerSpectrum,
    target: f64,
    timing: &ResolvedTiming,
) -> AnalyzerResult<f64> {
    if !target.is_finite() || target <= 0.0 || target >= timing.nyquist() {
        return Err(AnalyzerError::invalid_config(format!(
            "target frequency {target} Hz outside (0, {})",
            timing.nyquist()
        )));
    }

    let index = (target / timing.frequency_resolution).floor() as usize;
    let pair = PeakPair::at_bin(spectrum, index)?;
    let correction = NuttallCorrection::from_peak(&pair, timing.fft_size)?;
    Ok(correction.vpp(timing.fft_size))
}

fn power_ratio_db(ratio: f64) -> AnalyzerResult<f64> {
    if ratio.is_nan() || ratio <= 0.0 {
        return Err(AnalyzerError::NonPositiveLogArgument { ratio });
    }
    Ok(DB_PER_DECADE * ratio.log10())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(sample_rate: f64, decimation: u8, fft_size: FftSize) -> ResolvedTiming {
        ResolvedTiming::new(sample_rate, decimation, fft_size).unwrap()
    }

    /// Two-bin peak at (42, 43) with powers (100, 400) in an 8K spectrum
    fn reference_spectrum() -> PowerSpectrum {
        let mut power = vec![0u64; 4096];
        power[42] = 100;
        power[43] = 400;
        PowerSpectrum::from_raw(&power)
    }

    #[test]
    fn test_reference_scenario() {
        let timing = timing(192_000.0, 1, FftSize::Points8K);
        assert!((timing.frequency_resolution - 23.4375).abs() < 1e-12);

        let analyzer = SpectralAnalyzer::new(AnalysisConfig {
            thdn: false,
            noise_floor: false,
            ..Default::default()
        });
        let result = analyzer.analyze(&reference_spectrum(), &timing).unwrap();

        assert_eq!((result.peak.k1_index, result.peak.k2_index), (42, 43));
        assert!((result.frequency - 1019.341_564).abs() < 1e-5);

        let alpha: f64 = 2.95494514 / 3.0 + 0.17671943 / 27.0 + 0.09230694 / 243.0;
        let amplitude =
            30.0 * (3.20976143 + 0.9187393 * alpha * alpha + 0.14734229 * alpha.powi(4)) / 8192.0;
        assert!((result.vpp - amplitude / 4096.0).abs() < 1e-15);
        assert!(result.is_complete());
    }

    #[test]
    fn test_dc_bins_ignored() {
        let mut power = vec![0u64; 4096];
        power[0] = 1_000_000;
        power[4] = 1_000_000;
        power[42] = 100;
        power[43] = 400;
        let spectrum = PowerSpectrum::from_raw(&power);

        let timing = timing(192_000.0, 1, FftSize::Points8K);
        let result = SpectralAnalyzer::default().analyze(&spectrum, &timing).unwrap();
        assert_eq!(result.peak.k2_index, 43);
    }

    #[test]
    fn test_flat_spectrum_fails() {
        // Power only in the DC bins
        let spectrum = PowerSpectrum::from_raw(&[7, 7, 7, 7, 7, 0, 0, 0]);
        let timing = timing(192_000.0, 1, FftSize::Points8K);
        assert_eq!(
            SpectralAnalyzer::default().analyze(&spectrum, &timing),
            Err(AnalyzerError::EmptyOrFlatSpectrum { bins: 8 })
        );
    }

    #[test]
    fn test_auto_bandwidth_index() {
        let t = timing(192_000.0, 1, FftSize::Points8K);
        // 20000 / 23.4375 = 853.33
        assert_eq!(bandwidth_index(Bandwidth::Auto, &t), 853);

        // Low sample rate would put 20 kHz beyond the spectrum
        let t = timing(8_000.0, 1, FftSize::Points8K);
        assert_eq!(bandwidth_index(Bandwidth::Auto, &t), 4096);

        let t = timing(48_000.0, 1, FftSize::Points16K);
        assert_eq!(bandwidth_index(Bandwidth::Auto, &t), 6827);

        for decimation in [1u8, 2, 7, 255] {
            for rate in [1_000.0, 48_000.0, 192_000.0, 125_000_000.0] {
                for size in [FftSize::Points8K, FftSize::Points16K] {
                    let t = timing(rate, decimation, size);
                    assert!(bandwidth_index(Bandwidth::Auto, &t) <= size.bins());
                }
            }
        }
    }

    #[test]
    fn test_explicit_bandwidth_index() {
        let t = timing(192_000.0, 1, FftSize::Points8K);
        assert_eq!(bandwidth_index(Bandwidth::Hz(10_000.0), &t), 427);
        assert_eq!(bandwidth_index(Bandwidth::Hz(0.0), &t), 0);
        assert_eq!(bandwidth_index(Bandwidth::Hz(1e9), &t), 4096);
    }

    #[test]
    fn test_thdn_with_known_residual() {
        // Fundamental window is bins 6..=14 around the (10, 11) pair
        let mut power = vec![0u64; 64];
        power[10] = 900;
        power[11] = 100;
        power[30] = 10;
        let spectrum = PowerSpectrum::from_raw(&power);
        let peak = PeakPair::locate(&spectrum).unwrap();

        let db = thdn(&spectrum, &peak, 64, FftSize::Points8K).unwrap();
        assert!((db - 10.0 * (10.0f64 / 1000.0).log10()).abs() < 1e-12);
    }

    #[test]
    fn test_thdn_zero_fundamental() {
        let spectrum = PowerSpectrum::from_raw(&[0; 64]);
        let peak = PeakPair {
            k1_index: 20,
            k1_power: 0.0,
            k2_index: 21,
            k2_power: 0.0,
        };
        assert_eq!(
            thdn(&spectrum, &peak, 64, FftSize::Points8K),
            Err(AnalyzerError::ZeroFundamentalPower)
        );
    }

    #[test]
    fn test_thdn_without_residual_is_rejected() {
        // Nothing outside the fundamental window
        let mut power = vec![0u64; 64];
        power[20] = 400;
        power[21] = 100;
        let spectrum = PowerSpectrum::from_raw(&power);
        let peak = PeakPair::locate(&spectrum).unwrap();

        assert_eq!(
            thdn(&spectrum, &peak, 64, FftSize::Points8K),
            Err(AnalyzerError::NonPositiveLogArgument { ratio: 0.0 })
        );
    }

    #[test]
    fn test_thdn_bandwidth_below_fundamental() {
        // Band ends before the fundamental: ratio goes negative
        let mut power = vec![0u64; 64];
        power[40] = 400;
        power[41] = 100;
        let spectrum = PowerSpectrum::from_raw(&power);
        let peak = PeakPair::locate(&spectrum).unwrap();

        assert!(matches!(
            thdn(&spectrum, &peak, 20, FftSize::Points8K),
            Err(AnalyzerError::NonPositiveLogArgument { ratio }) if ratio < 0.0
        ));
    }

    #[test]
    fn test_thd_sums_harmonic_windows() {
        let t = timing(192_000.0, 1, FftSize::Points8K);
        let mut power = vec![0u64; 4096];
        // Fundamental at bin 40, harmonics at 80 and 120
        power[40] = 10_000;
        power[80] = 100;
        power[120] = 100;
        // Outside every harmonic window: must not count
        power[100] = 5_000;
        let spectrum = PowerSpectrum::from_raw(&power);

        let frequency = 40.0 * t.frequency_resolution;
        let db = thd(&spectrum, frequency, 3, &t).unwrap();
        assert!((db - 10.0 * (200.0f64 / 10_000.0).log10()).abs() < 1e-12);

        // Harmonic beyond the spectrum contributes nothing
        let db = thd(&spectrum, frequency, 10, &t).unwrap();
        assert!(db.is_finite());
    }

    #[test]
    fn test_thd_rejects_bad_count() {
        let t = timing(192_000.0, 1, FftSize::Points8K);
        let spectrum = reference_spectrum();
        assert!(matches!(
            thd(&spectrum, 1000.0, 0, &t),
            Err(AnalyzerError::InvalidConfig(_))
        ));
        assert!(matches!(
            thd(&spectrum, 1000.0, 11, &t),
            Err(AnalyzerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_thd_failure_keeps_other_metrics() {
        // Pure two-bin peak: no harmonic power, THD ratio is 0
        let t = timing(192_000.0, 1, FftSize::Points8K);
        let analyzer = SpectralAnalyzer::new(AnalysisConfig {
            harmonic_count: Some(5),
            target_frequency: Some(1000.0),
            ..Default::default()
        });
        let result = analyzer.analyze(&reference_spectrum(), &t).unwrap();

        assert_eq!(result.thd, None);
        assert!(matches!(
            result.failure(Metric::Thd),
            Some(AnalyzerError::NonPositiveLogArgument { .. })
        ));
        assert!(result.vpp > 0.0);
        assert!(result.noise_floor.is_some());
        assert!(result.vpp_at_frequency.is_some());
    }

    #[test]
    fn test_noise_floor_formula() {
        let mut power = vec![0u64; 4096];
        power[8] = 4;
        power[9] = 5;
        power[2000] = 1_000;
        let spectrum = PowerSpectrum::from_raw(&power);

        let nf = noise_floor(&spectrum, 10, FftSize::Points8K);
        let expected = 3.0 / 8192.0 / 4096.0 / 2f64.sqrt() * NOISE_FLOOR_COEFFICIENT;
        assert!((nf - expected).abs() < 1e-20);
    }

    #[test]
    fn test_vpp_at_frequency() {
        let t = timing(192_000.0, 1, FftSize::Points8K);
        let spectrum = reference_spectrum();

        // 1000 Hz falls in bin 42
        let vpp = vpp_at_frequency(&spectrum, 1000.0, &t).unwrap();
        let peak = PeakPair::locate(&spectrum).unwrap();
        let expected = NuttallCorrection::from_peak(&peak, FftSize::Points8K)
            .unwrap()
            .vpp(FftSize::Points8K);
        assert_eq!(vpp, expected);

        // Nothing at 5 kHz
        assert!(matches!(
            vpp_at_frequency(&spectrum, 5_000.0, &t),
            Err(AnalyzerError::ZeroPeakPower { .. })
        ));

        assert!(matches!(
            vpp_at_frequency(&spectrum, 96_000.0, &t),
            Err(AnalyzerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let t = timing(192_000.0, 1, FftSize::Points8K);
        let mut power: Vec<u64> = (0..4096u64).map(|i| (i * 7919) % 97).collect();
        power[300] = 1_000_000;
        power[301] = 700_000;
        let spectrum = PowerSpectrum::from_raw(&power);

        let analyzer = SpectralAnalyzer::new(AnalysisConfig {
            harmonic_count: Some(4),
            target_frequency: Some(2_000.0),
            ..Default::default()
        });
        let first = analyzer.analyze(&spectrum, &t).unwrap();
        let second = analyzer.analyze(&spectrum, &t).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.vpp.to_bits(), second.vpp.to_bits());
        assert_eq!(first.frequency.to_bits(), second.frequency.to_bits());
    }
}
