//! Bounded register handshake with the FFT core
//!
//! ```text
//! Idle ──configure──▶ DecimationPending ──flag set──▶ DecimationReady
//!                            │ timeout                      │ trigger
//!                            ▼                              ▼
//!                          Failed ◀────────timeout──────  Computing
//!                                                           │ ready
//!                                                           ▼
//!                               Idle ◀──────fetch───────  DataReady
//! ```
//!
//! Both waits poll a status register at a fixed interval and give up
//! once the caller's timeout has elapsed; nothing here can block forever.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::timing::{Acquisition, ResolvedTiming};
use crate::config::{AcquisitionConfig, FftSize, DEFAULT_POLL_INTERVAL};
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::hardware::registers::*;
use crate::hardware::{Clock, RegisterBus, SystemClock};
use crate::spectrum::PowerSpectrum;

/// Where the controller is in the measurement cycle
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionState {
    Idle,
    DecimationPending,
    DecimationReady,
    Computing,
    DataReady,
    Failed(AnalyzerError),
}

impl AcquisitionState {
    pub fn name(&self) -> &'static str {
        match self {
            AcquisitionState::Idle => "Idle",
            AcquisitionState::DecimationPending => "DecimationPending",
            AcquisitionState::DecimationReady => "DecimationReady",
            AcquisitionState::Computing => "Computing",
            AcquisitionState::DataReady => "DataReady",
            AcquisitionState::Failed(_) => "Failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AcquisitionState::Failed(_))
    }
}

enum PollOutcome {
    Ready { polls: u32, elapsed: Duration },
    TimedOut { elapsed: Duration },
}

/// Drives one FFT analyzer core through configure → trigger → fetch
pub struct AcquisitionController<B, C = SystemClock> {
    bus: B,
    clock: C,
    poll_interval: Duration,
    state: AcquisitionState,
    /// Timing of the last successful decimation negotiation
    timing: Option<ResolvedTiming>,
    data_count_override: Option<u32>,
}

impl<B: RegisterBus> AcquisitionController<B> {
    /// Create a controller that waits on the wall clock
    pub fn new(bus: B) -> Self {
        Self::with_clock(bus, SystemClock::new())
    }
}

impl<B: RegisterBus, C: Clock> AcquisitionController<B, C> {
    /// Create a controller with an injected time source
    pub fn with_clock(bus: B, clock: C) -> Self {
        Self {
            bus,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: AcquisitionState::Idle,
            timing: None,
            data_count_override: None,
        }
    }

    /// Change the status poll cadence (default 10 ms)
    pub fn set_poll_interval(&mut self, interval: Duration) -> AnalyzerResult<()> {
        if interval.is_zero() {
            return Err(AnalyzerError::invalid_config("poll interval must be non-zero"));
        }
        self.poll_interval = interval;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    /// Timing negotiated by the last successful `configure`
    pub fn timing(&self) -> Option<&ResolvedTiming> {
        self.timing.as_ref()
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Release the register bus
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Forget any negotiated timing and return to `Idle`
    pub fn reset(&mut self) {
        self.state = AcquisitionState::Idle;
        self.timing = None;
    }

    /// IP core version register
    pub fn version(&mut self) -> AnalyzerResult<u32> {
        Ok(self.bus.read_u32(VERSION)?)
    }

    /// Enable the core; required before any measurement
    pub fn enable(&mut self) -> AnalyzerResult<()> {
        self.update_module_enable(MODULE_ENABLE_BIT, 0)
    }

    pub fn disable(&mut self) -> AnalyzerResult<()> {
        self.update_module_enable(0, MODULE_ENABLE_BIT)
    }

    /// Stream raw ADC data upstream while measuring
    pub fn enable_upload(&mut self) -> AnalyzerResult<()> {
        self.update_module_enable(UPLOAD_ENABLE_BIT, 0)
    }

    pub fn disable_upload(&mut self) -> AnalyzerResult<()> {
        self.update_module_enable(0, UPLOAD_ENABLE_BIT)
    }

    fn update_module_enable(&mut self, set: u8, clear: u8) -> AnalyzerResult<()> {
        let current = self.bus.read_u8(MODULE_ENABLE)?;
        self.bus.write_u8(MODULE_ENABLE, (current | set) & !clear)?;
        Ok(())
    }

    /// Request a decimation and wait (up to `timeout`) for the core to apply it
    ///
    /// The configuration is validated before any register is written.
    pub fn configure(
        &mut self,
        config: &AcquisitionConfig,
        timeout: Duration,
    ) -> AnalyzerResult<ResolvedTiming> {
        config.validate()?;

        self.state = AcquisitionState::DecimationPending;
        self.timing = None;

        match self.negotiate_decimation(config, timeout) {
            Ok(timing) => {
                info!(
                    decimation = timing.decimation,
                    effective_sample_rate = timing.effective_sample_rate,
                    frequency_resolution = timing.frequency_resolution,
                    "decimation resolved"
                );
                self.timing = Some(timing);
                self.data_count_override = config.data_count_override;
                self.state = AcquisitionState::DecimationReady;
                Ok(timing)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn negotiate_decimation(
        &mut self,
        config: &AcquisitionConfig,
        timeout: Duration,
    ) -> AnalyzerResult<ResolvedTiming> {
        let requested = config.decimation.register_value();
        debug!(requested, "writing decimation");
        self.bus.write_u8(DECIMATION_CONFIG, requested)?;
        self.bus.write_u8(DECIMATION_CONTROL, DECIMATION_ENABLE)?;

        match self.poll_flag(DECIMATION_CONTROL, DECIMATION_ENABLE, timeout)? {
            PollOutcome::Ready { polls, elapsed } => {
                debug!(polls, ?elapsed, "decimation enabled");
            }
            PollOutcome::TimedOut { elapsed } => {
                return Err(AnalyzerError::DecimationTimeout {
                    elapsed,
                    limit: timeout,
                });
            }
        }

        let resolved = self.bus.read_u8(DECIMATION_VALUE)?;
        ResolvedTiming::new(config.sample_rate, resolved, config.fft_size)
    }

    /// Start a compute cycle and wait (up to `timeout`) for it to finish
    ///
    /// Allowed after `configure`, or again after a `fetch` while the
    /// negotiated decimation is still in effect.
    pub fn trigger(&mut self, timeout: Duration) -> AnalyzerResult<()> {
        let armed = match self.state {
            AcquisitionState::DecimationReady => true,
            AcquisitionState::Idle => self.timing.is_some(),
            _ => false,
        };
        if !armed {
            return Err(AnalyzerError::InvalidState {
                expected: "DecimationReady",
                found: self.state.name(),
            });
        }

        self.state = AcquisitionState::Computing;
        match self.run_compute(timeout) {
            Ok(()) => {
                self.state = AcquisitionState::DataReady;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn run_compute(&mut self, timeout: Duration) -> AnalyzerResult<()> {
        self.bus.write_u8(FFT_STATE, FFT_BUSY)?;
        self.bus.write_u8(FFT_START, FFT_START_COMMAND)?;

        match self.poll_flag(FFT_STATE, FFT_READY, timeout)? {
            PollOutcome::Ready { polls, elapsed } => {
                debug!(polls, ?elapsed, "FFT ready");
                Ok(())
            }
            PollOutcome::TimedOut { elapsed } => Err(AnalyzerError::ComputeTimeout {
                elapsed,
                limit: timeout,
            }),
        }
    }

    /// Read the power bins of a finished compute cycle
    pub fn fetch(&mut self) -> AnalyzerResult<Acquisition> {
        let timing = match (&self.state, self.timing) {
            (AcquisitionState::DataReady, Some(timing)) => timing,
            _ => {
                return Err(AnalyzerError::InvalidState {
                    expected: "DataReady",
                    found: self.state.name(),
                })
            }
        };

        match self.read_bins(timing.fft_size) {
            Ok(spectrum) => {
                self.state = AcquisitionState::Idle;
                Ok(Acquisition { spectrum, timing })
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn read_bins(&mut self, fft_size: FftSize) -> AnalyzerResult<PowerSpectrum> {
        let words = match self.data_count_override {
            Some(words) => words,
            None => self.bus.read_u32(FFT_RAM_COUNT)?,
        };
        let bins = (words / WORDS_PER_BIN) as usize;
        if bins == 0 {
            return Err(AnalyzerError::EmptySpectrum);
        }
        if bins > fft_size.bins() {
            return Err(AnalyzerError::OversizedSpectrum {
                bins,
                limit: fft_size.bins(),
            });
        }

        let mut raw = Vec::with_capacity(bins);
        for _ in 0..bins {
            let low = self.bus.read_u32(FFT_RAM_READ)?;
            let high = self.bus.read_u32(FFT_RAM_READ)?;
            raw.push(u64::from(high) << 32 | u64::from(low));
        }
        debug!(words, bins, "read FFT power data");

        Ok(PowerSpectrum::from_raw(&raw))
    }

    /// Run configure, trigger and fetch as one cycle, each wait bounded by `timeout`
    pub fn acquire(
        &mut self,
        config: &AcquisitionConfig,
        timeout: Duration,
    ) -> AnalyzerResult<Acquisition> {
        self.configure(config, timeout)?;
        self.trigger(timeout)?;
        self.fetch()
    }

    /// Poll `address` every interval until it reads `expected` or `timeout` elapses
    fn poll_flag(
        &mut self,
        address: u32,
        expected: u8,
        timeout: Duration,
    ) -> AnalyzerResult<PollOutcome> {
        let start = self.clock.now();
        let mut polls = 0u32;

        loop {
            self.clock.sleep(self.poll_interval);
            polls += 1;

            let value = self.bus.read_u8(address)?;
            let elapsed = self.clock.now().saturating_sub(start);

            if value == expected {
                return Ok(PollOutcome::Ready { polls, elapsed });
            }
            if elapsed >= timeout {
                return Ok(PollOutcome::TimedOut { elapsed });
            }
        }
    }

    fn fail(&mut self, err: AnalyzerError) -> AnalyzerError {
        warn!(state = self.state.name(), error = %err, "acquisition failed");
        self.state = AcquisitionState::Failed(err.clone());
        self.timing = None;
        err
    }
}
