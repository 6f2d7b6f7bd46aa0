//! Spectral analysis of FFT power spectra

pub mod analysis;
pub mod fft;
pub mod measurement;
pub mod nuttall;
pub mod peak;
pub mod power;
pub mod window;

pub use analysis::SpectralAnalyzer;
pub use fft::{synthesize_tones, FftEngine, Tone};
pub use measurement::{MeasurementResult, Metric, MetricFailure};
pub use nuttall::NuttallCorrection;
pub use peak::PeakPair;
pub use power::PowerSpectrum;
pub use window::{generate_window, WindowType};
