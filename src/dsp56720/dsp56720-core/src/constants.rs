use crate::utils::Word;

// Width of a DSP machine word in bits
pub const WORD_BITS: u32 = 24;
pub const WORD_MASK: Word = 0x00FF_FFFF;

// Capacity of every device-owned word queue
pub const QUEUE_CAPACITY: usize = 8192;

// Cycles per sample period until PCTL decoding drives the clock
pub const DEFAULT_CYCLES_PER_SAMPLE: u32 = 2133;

pub mod address_space {
    // Top-of-memory peripheral window backed by flat storage (X and Y)
    pub const IO_FIRST: u32 = 0xFF_FF80;
    pub const IO_LAST: u32 = 0xFF_FFFF;
    pub const IO_SIZE: usize = (IO_LAST - IO_FIRST + 1) as usize;
    pub const IO_BANKS: usize = 2;
}

pub mod vectors {
    use crate::dsp::Vector;

    // ESAI (vector base relative)
    pub const ESAI_TRANSMIT_DATA: Vector = 0x38;
    pub const ESAI_TRANSMIT_DATA_WITH_EXCEPTION: Vector = 0x3C;
    pub const ESAI_TRANSMIT_LAST_SLOT: Vector = 0x3E;

    // SHI
    pub const SHI_TRANSMIT_DATA: Vector = 0x40;
    pub const SHI_RECEIVE_FIFO_NOT_EMPTY: Vector = 0x44;
    pub const SHI_RECEIVE_FIFO_FULL: Vector = 0x48;
}

pub mod cgm {
    pub const PCTL: u32 = 0xFF_FF7D; // PLL control (X)
}

pub mod ccm {
    pub const EMBC: u32 = 0xFF_FFE6; // External memory burst control (Y)
    pub const ODBC: u32 = 0xFF_FFE2; // Debug and burst control (Y)
}

pub mod chipid {
    pub const CHIDR: u32 = 0xFF_FFF5; // Chip identification (X)
    pub const CHIP_ID: u32 = 0x720;
}

pub mod shi {
    pub const HRX: u32 = 0xFF_FF94; // Receive FIFO
    pub const HTX: u32 = 0xFF_FF93; // Transmit register
    pub const HSAR: u32 = 0xFF_FF92; // I2C slave address
    pub const HCSR: u32 = 0xFF_FF91; // Control/status
    pub const HCKR: u32 = 0xFF_FF90; // Clock control
}

pub mod esai {
    pub const TX_CHANNELS: usize = 6;
    pub const RX_CHANNELS: usize = 4;

    pub const TX0: u32 = 0xFF_FFA0;
    pub const TX5: u32 = 0xFF_FFA5;
    pub const RX0: u32 = 0xFF_FFA8;
    pub const RX3: u32 = 0xFF_FFAB;
    pub const SAISR: u32 = 0xFF_FFB3; // Status
    pub const SAICR: u32 = 0xFF_FFB4; // Common control
    pub const TCR: u32 = 0xFF_FFB5; // Transmit control
    pub const TCCR: u32 = 0xFF_FFB6; // Transmit clock control
    pub const RCR: u32 = 0xFF_FFB7; // Receive control
    pub const RCCR: u32 = 0xFF_FFB8; // Receive clock control
}
