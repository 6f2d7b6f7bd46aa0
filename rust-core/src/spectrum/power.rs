//! Half-spectrum of bin powers as delivered by the FFT core

use std::ops::Range;

use crate::error::{AnalyzerError, AnalyzerResult};

/// Bins at the bottom of the spectrum dominated by DC and its leakage
pub const DC_BINS: usize = 5;

/// Ordered, 0-indexed bin powers (length = FFT size / 2)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerSpectrum {
    bins: Vec<f64>,
}

impl PowerSpectrum {
    /// Wrap bin powers, rejecting negative or non-finite values
    pub fn new(bins: Vec<f64>) -> AnalyzerResult<Self> {
        if let Some((index, power)) = bins
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(AnalyzerError::invalid_config(format!(
                "bin {index} has invalid power {power}"
            )));
        }
        Ok(Self { bins })
    }

    /// Convert raw integer powers read from the data port
    pub fn from_raw(raw: &[u64]) -> Self {
        Self {
            bins: raw.iter().map(|&p| p as f64).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Power of one bin; 0 outside the spectrum
    pub fn power(&self, index: usize) -> f64 {
        self.bins.get(index).copied().unwrap_or(0.0)
    }

    /// Sum of bin powers over `range`, clipped to the spectrum
    pub fn band_power(&self, range: Range<usize>) -> f64 {
        let end = range.end.min(self.bins.len());
        if range.start >= end {
            return 0.0;
        }
        self.bins[range.start..end].iter().sum()
    }

    /// Copy with the DC bins forced to zero
    pub fn without_dc(&self) -> Self {
        let mut bins = self.bins.clone();
        let dc = DC_BINS.min(bins.len());
        bins[..dc].fill(0.0);
        Self { bins }
    }

    /// Index and power of the strongest bin (first one on ties)
    pub fn argmax(&self) -> Option<(usize, f64)> {
        self.bins
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (index, power)| match best {
                Some((_, best_power)) if best_power >= power => best,
                _ => Some((index, power)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative_power() {
        assert!(PowerSpectrum::new(vec![0.0, 1.0, 2.0]).is_ok());
        assert!(PowerSpectrum::new(vec![0.0, -1.0]).is_err());
        assert!(PowerSpectrum::new(vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_without_dc() {
        let spectrum = PowerSpectrum::from_raw(&[9, 9, 9, 9, 9, 9, 9]);
        let scrubbed = spectrum.without_dc();
        assert_eq!(scrubbed.bins(), &[0.0, 0.0, 0.0, 0.0, 0.0, 9.0, 9.0]);
        // Original untouched
        assert_eq!(spectrum.power(0), 9.0);

        let short = PowerSpectrum::from_raw(&[1, 2]).without_dc();
        assert_eq!(short.bins(), &[0.0, 0.0]);
    }

    #[test]
    fn test_band_power_clips() {
        let spectrum = PowerSpectrum::from_raw(&[1, 2, 3, 4]);
        assert_eq!(spectrum.band_power(1..3), 5.0);
        assert_eq!(spectrum.band_power(2..100), 7.0);
        assert_eq!(spectrum.band_power(8..4), 0.0);
        assert_eq!(spectrum.power(10), 0.0);
    }

    #[test]
    fn test_argmax_first_on_ties() {
        let spectrum = PowerSpectrum::from_raw(&[0, 5, 3, 5]);
        assert_eq!(spectrum.argmax(), Some((1, 5.0)));
        assert_eq!(PowerSpectrum::default().argmax(), None);
    }
}
