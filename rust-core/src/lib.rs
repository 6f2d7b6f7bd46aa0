//! FFT Analyzer - Spectral Measurement Core
//!
//! Drives an FPGA FFT analyzer core through its register handshake and
//! turns the returned power spectrum into Vpp, frequency, THD, THD+N,
//! noise floor and amplitude at a target frequency.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![cfg_attr(feature = "python", allow(non_local_definitions))]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hardware;
pub mod instrument;
pub mod spectrum;

#[cfg(feature = "python")]
pub mod python_bindings;

pub use acquisition::{Acquisition, AcquisitionController, AcquisitionState, ResolvedTiming};
pub use config::{
    AcquisitionConfig, AnalysisConfig, Bandwidth, Decimation, FftSize, InstrumentConfig,
    PollPolicy,
};
pub use error::{AnalyzerError, AnalyzerResult, BusError};
pub use hardware::{Clock, ManualClock, RegisterBus, SimulatedFftCore, SystemClock};
pub use instrument::FftAnalyzer;
pub use spectrum::{FftEngine, MeasurementResult, Metric, PowerSpectrum, SpectralAnalyzer, Tone};
