//! Acquisition controller
//!
//! Negotiates decimation with the FFT core, runs one compute cycle and
//! reads the power bins back, with every wait bounded by a timeout.

pub mod controller;
pub mod timing;

pub use controller::{AcquisitionController, AcquisitionState};
pub use timing::{Acquisition, ResolvedTiming};
