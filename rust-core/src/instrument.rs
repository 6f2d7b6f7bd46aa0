//! FFT analyzer instrument
//!
//! Ties one acquisition controller to one spectral analyzer and keeps the
//! analysis settings between measurements, so repeated measurements only
//! need `analyze()` once the core is configured.

use tracing::info;

use crate::acquisition::{Acquisition, AcquisitionController, ResolvedTiming};
use crate::config::{
    validate_bandwidth, validate_harmonic_count, validate_target_frequency, AcquisitionConfig,
    AnalysisConfig, Bandwidth, InstrumentConfig, PollPolicy,
};
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::hardware::{Clock, RegisterBus, SystemClock};
use crate::spectrum::{MeasurementResult, SpectralAnalyzer};

/// One FFT analyzer core with its cached measurement settings
pub struct FftAnalyzer<B, C = SystemClock> {
    controller: AcquisitionController<B, C>,
    analyzer: SpectralAnalyzer,
    acquisition: AcquisitionConfig,
    poll: PollPolicy,
    /// Spectrum behind the last successful `analyze`
    last: Option<Acquisition>,
}

impl<B: RegisterBus> FftAnalyzer<B> {
    pub fn new(bus: B, config: InstrumentConfig) -> AnalyzerResult<Self> {
        Self::with_clock(bus, SystemClock::new(), config)
    }
}

impl<B: RegisterBus, C: Clock> FftAnalyzer<B, C> {
    /// Create an instrument with an injected time source
    ///
    /// # Arguments
    /// * `bus` - Register transport of the core
    /// * `clock` - Time source for the handshake polls
    /// * `config` - Validated before anything else happens
    pub fn with_clock(bus: B, clock: C, config: InstrumentConfig) -> AnalyzerResult<Self> {
        config.validate()?;

        let mut controller = AcquisitionController::with_clock(bus, clock);
        controller.set_poll_interval(config.poll.interval)?;

        Ok(Self {
            controller,
            analyzer: SpectralAnalyzer::new(config.analysis),
            acquisition: config.acquisition,
            poll: config.poll,
            last: None,
        })
    }

    pub fn controller(&self) -> &AcquisitionController<B, C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut AcquisitionController<B, C> {
        &mut self.controller
    }

    /// Release the register bus
    pub fn into_inner(self) -> B {
        self.controller.into_inner()
    }

    pub fn acquisition_config(&self) -> &AcquisitionConfig {
        &self.acquisition
    }

    pub fn analysis_config(&self) -> &AnalysisConfig {
        self.analyzer.config()
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    /// The spectrum behind the last successful `analyze`
    pub fn last_acquisition(&self) -> Option<&Acquisition> {
        self.last.as_ref()
    }

    /// Replace the acquisition settings; takes effect at the next `configure`
    ///
    /// Cached analysis settings must still fit the new Nyquist frequency.
    pub fn set_acquisition_config(&mut self, config: AcquisitionConfig) -> AnalyzerResult<()> {
        config.validate()?;
        self.analyzer.config().validate(config.nyquist())?;
        self.acquisition = config;
        Ok(())
    }

    pub fn set_analysis_config(&mut self, config: AnalysisConfig) -> AnalyzerResult<()> {
        config.validate(self.acquisition.nyquist())?;
        self.analyzer.update_config(config);
        Ok(())
    }

    /// Harmonics summed for THD; `None` stops computing THD
    pub fn set_harmonic_count(&mut self, count: Option<u8>) -> AnalyzerResult<()> {
        if let Some(count) = count {
            validate_harmonic_count(count)?;
        }
        self.update_analysis(|config| config.harmonic_count = count);
        Ok(())
    }

    /// Frequency for the interpolated amplitude; `None` stops reporting it
    pub fn set_target_frequency(&mut self, frequency: Option<f64>) -> AnalyzerResult<()> {
        if let Some(frequency) = frequency {
            validate_target_frequency(frequency, self.acquisition.nyquist())?;
        }
        self.update_analysis(|config| config.target_frequency = frequency);
        Ok(())
    }

    pub fn set_bandwidth(&mut self, bandwidth: Bandwidth) -> AnalyzerResult<()> {
        if let Bandwidth::Hz(hz) = bandwidth {
            validate_bandwidth(hz, self.acquisition.nyquist())?;
        }
        self.update_analysis(|config| config.bandwidth = bandwidth);
        Ok(())
    }

    fn update_analysis(&mut self, change: impl FnOnce(&mut AnalysisConfig)) {
        let mut config = self.analyzer.config().clone();
        change(&mut config);
        self.analyzer.update_config(config);
    }

    pub fn version(&mut self) -> AnalyzerResult<u32> {
        self.controller.version()
    }

    pub fn enable(&mut self) -> AnalyzerResult<()> {
        self.controller.enable()
    }

    pub fn disable(&mut self) -> AnalyzerResult<()> {
        self.controller.disable()
    }

    pub fn enable_upload(&mut self) -> AnalyzerResult<()> {
        self.controller.enable_upload()
    }

    pub fn disable_upload(&mut self) -> AnalyzerResult<()> {
        self.controller.disable_upload()
    }

    /// Negotiate decimation for the current acquisition settings
    pub fn configure(&mut self) -> AnalyzerResult<ResolvedTiming> {
        self.controller.configure(&self.acquisition, self.poll.timeout)
    }

    /// Run one compute cycle and analyze it with the cached settings
    ///
    /// Requires a prior `configure`; may be repeated without reconfiguring.
    pub fn analyze(&mut self) -> AnalyzerResult<MeasurementResult> {
        self.controller.trigger(self.poll.timeout)?;
        let acquisition = self.controller.fetch()?;
        let result = self
            .analyzer
            .analyze(&acquisition.spectrum, &acquisition.timing)?;
        self.last = Some(acquisition);
        Ok(result)
    }

    /// Analyze the last spectrum again, e.g. after changing settings
    pub fn reanalyze(&self) -> AnalyzerResult<MeasurementResult> {
        let acquisition = self.last.as_ref().ok_or(AnalyzerError::InvalidState {
            expected: "DataReady",
            found: "no acquisition",
        })?;
        self.analyzer
            .analyze(&acquisition.spectrum, &acquisition.timing)
    }

    /// Full measurement: restart the core, configure, compute and analyze
    pub fn measure(&mut self) -> AnalyzerResult<MeasurementResult> {
        self.disable()?;
        self.enable()?;
        let timing = self.configure()?;
        let result = self.analyze()?;
        info!(
            decimation = timing.decimation,
            vpp = result.vpp,
            frequency = result.frequency,
            "measurement complete"
        );
        Ok(result)
    }
}
