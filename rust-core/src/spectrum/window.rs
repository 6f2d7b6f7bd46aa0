//! Window functions applied before the transform
//!
//! The sub-bin correction only holds for the Nuttall window below, so
//! that is what the synthetic engine uses by default.

use std::f64::consts::PI;

/// 4-term Nuttall window with continuous first derivative
const NUTTALL_COEFFICIENTS: [f64; 4] = [0.338946, 0.481973, 0.161054, 0.018027];

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    /// w[n] = a0 - a1*cos(2πn/M) + a2*cos(4πn/M) - a3*cos(6πn/M)
    /// Sidelobe attenuation: ~82 dB, falloff 30 dB/octave
    #[default]
    Nuttall,

    /// Rectangular window (no windowing)
    Rectangular,
}

/// Generate periodic (DFT-even) window coefficients
///
/// # Arguments
/// * `window_type` - Type of window function
/// * `length` - Number of samples (M)
///
/// # Returns
/// Vector of window coefficients w[n] for n = 0..M-1
pub fn generate_window(window_type: WindowType, length: usize) -> Vec<f64> {
    let m = length as f64;

    match window_type {
        WindowType::Nuttall => {
            let [a0, a1, a2, a3] = NUTTALL_COEFFICIENTS;
            (0..length)
                .map(|n| {
                    let angle = 2.0 * PI * n as f64 / m;
                    a0 - a1 * angle.cos() + a2 * (2.0 * angle).cos() - a3 * (3.0 * angle).cos()
                })
                .collect()
        }

        WindowType::Rectangular => vec![1.0; length],
    }
}
