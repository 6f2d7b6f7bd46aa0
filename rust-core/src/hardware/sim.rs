//! Software model of the FFT analyzer IP core
//!
//! Behaves like the register block closely enough to drive the
//! acquisition controller end to end: decimation negotiation, the
//! start/busy handshake, and the two-words-per-bin data FIFO. Latencies
//! are counted in status polls so tests stay deterministic.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::registers::*;
use super::RegisterBus;
use crate::config::DECIMATION_AUTO;
use crate::error::BusError;

/// One register access seen by the simulated core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusAccess {
    Read { address: u32 },
    Write { address: u32, value: u8 },
}

/// Simulated FFT analyzer register block
#[derive(Debug, Clone)]
pub struct SimulatedFftCore {
    /// Plain read/write registers (version, enable bits, ...)
    registers: HashMap<u32, u8>,

    /// Power bins returned by the next compute cycle
    spectrum: Vec<u64>,

    /// Words waiting in the data FIFO
    fifo: VecDeque<u32>,

    /// Decimation chosen when the auto sentinel is requested
    auto_decimation: u8,

    /// Replaces whatever decimation would have been resolved
    resolved_override: Option<u8>,

    /// Status polls before the decimation-enabled flag comes up (`None` = never)
    decimation_latency: Option<u32>,
    decimation_polls: u32,
    decimation_pending: bool,

    /// Status polls before the FFT reports ready (`None` = never)
    compute_latency: Option<u32>,
    compute_polls: u32,
    computing: bool,

    /// Value reported by the data count register instead of the FIFO length
    word_count_override: Option<u32>,

    /// Address that fails every access
    faulty_address: Option<u32>,

    /// Register accesses, data port words excluded
    log: Vec<BusAccess>,

    /// Words popped from the data port
    words_read: u64,
}

impl SimulatedFftCore {
    /// Create a core that will return `spectrum` from every compute cycle
    pub fn new(spectrum: Vec<u64>) -> Self {
        let mut registers = HashMap::new();
        registers.insert(VERSION, 0x12);

        Self {
            registers,
            spectrum,
            fifo: VecDeque::new(),
            auto_decimation: 1,
            resolved_override: None,
            decimation_latency: Some(1),
            decimation_polls: 0,
            decimation_pending: false,
            compute_latency: Some(1),
            compute_polls: 0,
            computing: false,
            word_count_override: None,
            faulty_address: None,
            log: Vec::new(),
            words_read: 0,
        }
    }

    /// Create a core from floating-point bin powers (rounded to integers)
    pub fn from_power(power: &[f64]) -> Self {
        Self::new(power.iter().map(|&p| p.max(0.0).round() as u64).collect())
    }

    /// Decimation reported when the auto sentinel is requested
    pub fn with_auto_decimation(mut self, decimation: u8) -> Self {
        self.auto_decimation = decimation;
        self
    }

    /// Force the resolved decimation value (e.g. 0 to model a broken core)
    pub fn with_resolved_decimation(mut self, decimation: u8) -> Self {
        self.resolved_override = Some(decimation);
        self
    }

    /// Polls until the decimation flag sets; `None` never sets it
    pub fn with_decimation_latency(mut self, polls: Option<u32>) -> Self {
        self.decimation_latency = polls;
        self
    }

    /// Polls until the FFT reports ready; `None` stays busy forever
    pub fn with_compute_latency(mut self, polls: Option<u32>) -> Self {
        self.compute_latency = polls;
        self
    }

    /// Report this many words from the data count register
    pub fn with_word_count(mut self, words: u32) -> Self {
        self.word_count_override = Some(words);
        self
    }

    /// Fail every access to `address`
    pub fn with_faulty_register(mut self, address: u32) -> Self {
        self.faulty_address = Some(address);
        self
    }

    /// Replace the spectrum for subsequent compute cycles
    pub fn load_spectrum(&mut self, spectrum: Vec<u64>) {
        self.spectrum = spectrum;
    }

    /// Register accesses since creation or the last `clear_log`
    ///
    /// Data port reads are only counted, see `words_read`.
    pub fn accesses(&self) -> &[BusAccess] {
        &self.log
    }

    /// Data port words read since creation or the last `clear_log`
    pub fn words_read(&self) -> u64 {
        self.words_read
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.words_read = 0;
    }

    /// Number of reads of `address` recorded in the log
    pub fn read_count(&self, address: u32) -> usize {
        self.log
            .iter()
            .filter(|a| matches!(a, BusAccess::Read { address: addr } if *addr == address))
            .count()
    }

    /// Raw value of a plain register
    pub fn register(&self, address: u32) -> u8 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    fn check(&self, address: u32) -> Result<(), BusError> {
        if address >= REGISTER_SPAN {
            return Err(BusError::new(address, "address outside register window"));
        }
        if self.faulty_address == Some(address) {
            return Err(BusError::new(address, "simulated bus fault"));
        }
        Ok(())
    }

    fn resolved_decimation(&self) -> u8 {
        if let Some(decimation) = self.resolved_override {
            return decimation;
        }
        match self.register(DECIMATION_CONFIG) {
            DECIMATION_AUTO => self.auto_decimation,
            requested => requested,
        }
    }

    fn start_compute(&mut self) {
        self.computing = true;
        self.compute_polls = 0;
        self.fifo = self
            .spectrum
            .iter()
            .flat_map(|&power| [power as u32, (power >> 32) as u32])
            .collect();
        debug!(bins = self.spectrum.len(), "simulated FFT started");
    }

    /// Count one status poll and report whether `latency` has been reached
    fn poll(polls: &mut u32, latency: Option<u32>) -> bool {
        *polls += 1;
        matches!(latency, Some(limit) if *polls >= limit)
    }
}

impl RegisterBus for SimulatedFftCore {
    fn read_u8(&mut self, address: u32) -> Result<u8, BusError> {
        self.check(address)?;
        self.log.push(BusAccess::Read { address });

        let value = match address {
            DECIMATION_CONTROL => {
                if self.decimation_pending
                    && Self::poll(&mut self.decimation_polls, self.decimation_latency)
                {
                    DECIMATION_ENABLE
                } else {
                    DECIMATION_DISABLE
                }
            }
            DECIMATION_VALUE => self.resolved_decimation(),
            FFT_STATE => {
                if self.computing && Self::poll(&mut self.compute_polls, self.compute_latency) {
                    self.computing = false;
                    self.registers.insert(FFT_STATE, FFT_READY);
                }
                self.register(FFT_STATE)
            }
            other => self.register(other),
        };
        Ok(value)
    }

    fn write_u8(&mut self, address: u32, value: u8) -> Result<(), BusError> {
        self.check(address)?;
        self.log.push(BusAccess::Write { address, value });

        match address {
            DECIMATION_CONTROL if value == DECIMATION_ENABLE => {
                self.decimation_pending = true;
                self.decimation_polls = 0;
            }
            FFT_START if value == FFT_START_COMMAND => self.start_compute(),
            _ => {}
        }
        self.registers.insert(address, value);
        Ok(())
    }

    fn read_u32(&mut self, address: u32) -> Result<u32, BusError> {
        self.check(address)?;

        if address == FFT_RAM_READ {
            self.words_read += 1;
            return Ok(self.fifo.pop_front().unwrap_or(0));
        }

        self.log.push(BusAccess::Read { address });
        let value = match address {
            FFT_RAM_COUNT => self
                .word_count_override
                .unwrap_or(self.fifo.len() as u32),
            other => self.register(other) as u32,
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimation_flag_latency() {
        let mut core = SimulatedFftCore::new(vec![]).with_decimation_latency(Some(3));

        // Not pending yet: flag stays low
        assert_eq!(core.read_u8(DECIMATION_CONTROL).unwrap(), DECIMATION_DISABLE);

        core.write_u8(DECIMATION_CONTROL, DECIMATION_ENABLE).unwrap();
        assert_eq!(core.read_u8(DECIMATION_CONTROL).unwrap(), DECIMATION_DISABLE);
        assert_eq!(core.read_u8(DECIMATION_CONTROL).unwrap(), DECIMATION_DISABLE);
        assert_eq!(core.read_u8(DECIMATION_CONTROL).unwrap(), DECIMATION_ENABLE);
    }

    #[test]
    fn test_auto_decimation_resolution() {
        let mut core = SimulatedFftCore::new(vec![]).with_auto_decimation(8);

        core.write_u8(DECIMATION_CONFIG, DECIMATION_AUTO).unwrap();
        assert_eq!(core.read_u8(DECIMATION_VALUE).unwrap(), 8);

        core.write_u8(DECIMATION_CONFIG, 3).unwrap();
        assert_eq!(core.read_u8(DECIMATION_VALUE).unwrap(), 3);
    }

    #[test]
    fn test_fifo_splits_bins_into_words() {
        let power = 0x0000_00AB_1234_5678u64;
        let mut core = SimulatedFftCore::new(vec![power, 7]);

        core.write_u8(FFT_STATE, FFT_BUSY).unwrap();
        core.write_u8(FFT_START, FFT_START_COMMAND).unwrap();
        assert_eq!(core.read_u8(FFT_STATE).unwrap(), FFT_READY);

        assert_eq!(core.read_u32(FFT_RAM_COUNT).unwrap(), 4);
        assert_eq!(core.read_u32(FFT_RAM_READ).unwrap(), 0x1234_5678);
        assert_eq!(core.read_u32(FFT_RAM_READ).unwrap(), 0xAB);
        assert_eq!(core.read_u32(FFT_RAM_READ).unwrap(), 7);
        assert_eq!(core.read_u32(FFT_RAM_READ).unwrap(), 0);
        assert_eq!(core.read_u32(FFT_RAM_COUNT).unwrap(), 0);
    }

    #[test]
    fn test_data_words_are_counted_not_logged() {
        let mut core = SimulatedFftCore::new(vec![1; 4096]);
        core.write_u8(FFT_START, FFT_START_COMMAND).unwrap();
        core.clear_log();

        for _ in 0..8192 {
            core.read_u32(FFT_RAM_READ).unwrap();
        }
        core.read_u32(FFT_RAM_COUNT).unwrap();

        assert_eq!(core.words_read(), 8192);
        assert_eq!(
            core.accesses(),
            &[BusAccess::Read {
                address: FFT_RAM_COUNT
            }]
        );

        core.clear_log();
        assert_eq!(core.words_read(), 0);
    }

    #[test]
    fn test_compute_never_finishes() {
        let mut core = SimulatedFftCore::new(vec![1, 2, 3]).with_compute_latency(None);
        core.write_u8(FFT_STATE, FFT_BUSY).unwrap();
        core.write_u8(FFT_START, FFT_START_COMMAND).unwrap();

        for _ in 0..1000 {
            assert_eq!(core.read_u8(FFT_STATE).unwrap(), FFT_BUSY);
        }
    }

    #[test]
    fn test_faulty_register_and_log() {
        let mut core = SimulatedFftCore::new(vec![]).with_faulty_register(FFT_RAM_COUNT);

        let err = core.read_u32(FFT_RAM_COUNT).unwrap_err();
        assert_eq!(err.address, FFT_RAM_COUNT);
        assert!(core.read_u8(REGISTER_SPAN).is_err());

        core.write_u8(MODULE_ENABLE, 0x01).unwrap();
        core.read_u8(MODULE_ENABLE).unwrap();
        assert_eq!(
            core.accesses(),
            &[
                BusAccess::Write {
                    address: MODULE_ENABLE,
                    value: 0x01
                },
                BusAccess::Read {
                    address: MODULE_ENABLE
                },
            ]
        );
        assert_eq!(core.read_count(MODULE_ENABLE), 1);

        core.clear_log();
        assert!(core.accesses().is_empty());
    }
}
