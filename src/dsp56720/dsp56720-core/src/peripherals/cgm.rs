use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{debug, warn};

use super::mods::{Address, Peripheral, Register};
use crate::bitfield::{BitField, Packed};
use crate::constants::{cgm, DEFAULT_CYCLES_PER_SAMPLE};
use crate::instruction::Instruction;
use crate::queue::QueueShutdown;
use crate::utils::Word;

// PCTL fields
pub type Mf = Packed<0, 8>; // Multiplication factor
pub type Od = Packed<14, 2>; // Output divider
pub type Pd = Packed<16, 5>; // Input divider

/// Shared sample-period reference read by the audio interface
#[derive(Clone, Debug)]
pub struct SampleClock {
    cycles_per_sample: Arc<AtomicU32>,
}

impl SampleClock {
    pub fn new(cycles_per_sample: u32) -> Self {
        Self {
            cycles_per_sample: Arc::new(AtomicU32::new(cycles_per_sample)),
        }
    }

    pub fn cycles_per_sample(&self) -> u32 {
        self.cycles_per_sample.load(Ordering::Relaxed)
    }

    pub fn set_cycles_per_sample(&self, cycles: u32) {
        self.cycles_per_sample.store(cycles, Ordering::Relaxed);
    }
}

/// Clock generation module: owns the CPU-cycle to sample-period ratio
pub struct ClockGenerationModule {
    clock: SampleClock,
    pctl: BitField, // Last PCTL value written
}

impl ClockGenerationModule {
    pub fn new() -> Self {
        Self::with_cycles_per_sample(DEFAULT_CYCLES_PER_SAMPLE)
    }

    pub fn with_cycles_per_sample(cycles_per_sample: u32) -> Self {
        Self {
            clock: SampleClock::new(cycles_per_sample),
            pctl: BitField::default(),
        }
    }

    pub fn sample_clock(&self) -> SampleClock {
        self.clock.clone()
    }

    pub fn cycles_per_sample(&self) -> u32 {
        self.clock.cycles_per_sample()
    }

    pub fn pctl(&self) -> Word {
        self.pctl.value()
    }

    // PLL settings are recorded but do not retime the sample clock
    fn update_pctl(&mut self, value: Word) {
        self.pctl.set(value);
        debug!(
            "Write CGM PCTL 0x{:06x} MF={} OD={} PD={}",
            value,
            Mf::from(self.pctl).get(),
            Od::from(self.pctl).get(),
            Pd::from(self.pctl).get()
        );
    }
}

impl Default for ClockGenerationModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for ClockGenerationModule {
    fn registers(&self) -> Vec<Register> {
        vec![Register::new("PCTL", Address::x(cgm::PCTL))]
    }

    fn read(&mut self, address: Address, _inst: Instruction) -> Result<Word, QueueShutdown> {
        match address.offset {
            cgm::PCTL => Ok(0),
            _ => {
                warn!("Invalid CGM read at: 0x{:06x}", address.offset);
                Ok(0)
            }
        }
    }

    fn write(&mut self, address: Address, value: Word) -> Result<(), QueueShutdown> {
        match address.offset {
            cgm::PCTL => self.update_pctl(value),
            _ => warn!("Invalid CGM write at: 0x{:06x}", address.offset),
        }
        Ok(())
    }
}
