//! Register map of the FFT analyzer IP core

pub const VERSION: u32 = 0x00;
pub const MODULE_ENABLE: u32 = 0x10;
pub const FFT_START: u32 = 0x13;
pub const FFT_STATE: u32 = 0x14;
pub const DECIMATION_CONFIG: u32 = 0x15;
pub const DECIMATION_VALUE: u32 = 0x16;
pub const DECIMATION_CONTROL: u32 = 0x17;
/// FIFO of 32-bit words, two per bin (low word first)
pub const FFT_RAM_READ: u32 = 0x80;
/// Number of 32-bit words waiting in the FIFO
pub const FFT_RAM_COUNT: u32 = 0x84;

/// Size of the register window
pub const REGISTER_SPAN: u32 = 0x1_0000;

// MODULE_ENABLE bits
pub const MODULE_ENABLE_BIT: u8 = 0x01;
pub const UPLOAD_ENABLE_BIT: u8 = 0x02;

// FFT_STATE values
pub const FFT_BUSY: u8 = 0x00;
pub const FFT_READY: u8 = 0x01;

pub const FFT_START_COMMAND: u8 = 0x01;

// DECIMATION_CONTROL values
pub const DECIMATION_DISABLE: u8 = 0x00;
pub const DECIMATION_ENABLE: u8 = 0x01;

/// 32-bit words per power bin on the data port
pub const WORDS_PER_BIN: u32 = 2;
