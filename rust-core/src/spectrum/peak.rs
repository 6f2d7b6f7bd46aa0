//! Peak-pair search: the two adjacent bins straddling the spectral peak

use tracing::debug;

use super::power::PowerSpectrum;
use crate::error::{AnalyzerError, AnalyzerResult};

/// Two adjacent bins, `k1_index < k2_index` always
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPair {
    pub k1_index: usize,
    pub k1_power: f64,
    pub k2_index: usize,
    pub k2_power: f64,
}

impl PeakPair {
    /// Pair the strongest bin with its stronger neighbour
    ///
    /// A tie between the neighbours goes to the right one.
    pub fn locate(spectrum: &PowerSpectrum) -> AnalyzerResult<Self> {
        let len = spectrum.len();
        if len < 3 {
            return Err(AnalyzerError::EmptyOrFlatSpectrum { bins: len });
        }

        let (max_index, max_power) = match spectrum.argmax() {
            Some((index, power)) if power > 0.0 => (index, power),
            _ => return Err(AnalyzerError::EmptyOrFlatSpectrum { bins: len }),
        };

        let second_index = if max_index == 0 {
            1
        } else if max_index == len - 1 {
            max_index - 1
        } else if spectrum.power(max_index - 1) > spectrum.power(max_index + 1) {
            max_index - 1
        } else {
            max_index + 1
        };
        let second_power = spectrum.power(second_index);

        let pair = if second_index < max_index {
            Self {
                k1_index: second_index,
                k1_power: second_power,
                k2_index: max_index,
                k2_power: max_power,
            }
        } else {
            Self {
                k1_index: max_index,
                k1_power: max_power,
                k2_index: second_index,
                k2_power: second_power,
            }
        };
        debug!(k1 = pair.k1_index, k2 = pair.k2_index, "peak pair located");
        Ok(pair)
    }

    /// The pair `(index, index + 1)`
    pub fn at_bin(spectrum: &PowerSpectrum, index: usize) -> AnalyzerResult<Self> {
        if index + 1 >= spectrum.len() {
            return Err(AnalyzerError::invalid_config(format!(
                "bin {} beyond spectrum of {} bins",
                index + 1,
                spectrum.len()
            )));
        }
        Ok(Self {
            k1_index: index,
            k1_power: spectrum.power(index),
            k2_index: index + 1,
            k2_power: spectrum.power(index + 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(power: &[u64]) -> PowerSpectrum {
        PowerSpectrum::from_raw(power)
    }

    #[test]
    fn test_right_neighbour_stronger() {
        let pair = PeakPair::locate(&spectrum(&[0, 0, 1, 10, 4, 0])).unwrap();
        assert_eq!((pair.k1_index, pair.k2_index), (3, 4));
        assert_eq!((pair.k1_power, pair.k2_power), (10.0, 4.0));
    }

    #[test]
    fn test_left_neighbour_stronger() {
        let pair = PeakPair::locate(&spectrum(&[0, 0, 6, 10, 4, 0])).unwrap();
        assert_eq!((pair.k1_index, pair.k2_index), (2, 3));
        assert_eq!((pair.k1_power, pair.k2_power), (6.0, 10.0));
    }

    #[test]
    fn test_tied_neighbours_pick_right() {
        let pair = PeakPair::locate(&spectrum(&[0, 0, 3, 10, 3, 0])).unwrap();
        assert_eq!((pair.k1_index, pair.k2_index), (3, 4));
    }

    #[test]
    fn test_peak_at_edges() {
        let last = PeakPair::locate(&spectrum(&[0, 1, 2, 9])).unwrap();
        assert_eq!((last.k1_index, last.k2_index), (2, 3));

        let first = PeakPair::locate(&spectrum(&[9, 1, 0])).unwrap();
        assert_eq!((first.k1_index, first.k2_index), (0, 1));
    }

    #[test]
    fn test_pairs_always_adjacent_and_ordered() {
        for peak in 1..15 {
            for left in [0u64, 2, 5] {
                for right in [0u64, 2, 5] {
                    let mut power = vec![0u64; 16];
                    power[peak] = 10;
                    power[peak - 1] = left;
                    power[peak + 1] = right;
                    let pair = PeakPair::locate(&spectrum(&power)).unwrap();
                    assert!(pair.k1_index < pair.k2_index);
                    assert_eq!(pair.k2_index - pair.k1_index, 1);
                    assert!(pair.k1_index == peak || pair.k2_index == peak);
                }
            }
        }
    }

    #[test]
    fn test_degenerate_spectra() {
        assert_eq!(
            PeakPair::locate(&spectrum(&[5, 6])),
            Err(AnalyzerError::EmptyOrFlatSpectrum { bins: 2 })
        );
        assert_eq!(
            PeakPair::locate(&spectrum(&[0; 64])),
            Err(AnalyzerError::EmptyOrFlatSpectrum { bins: 64 })
        );
    }

    #[test]
    fn test_at_bin() {
        let s = spectrum(&[1, 2, 3]);
        let pair = PeakPair::at_bin(&s, 1).unwrap();
        assert_eq!((pair.k1_power, pair.k2_power), (2.0, 3.0));
        assert!(PeakPair::at_bin(&s, 2).is_err());
    }
}
