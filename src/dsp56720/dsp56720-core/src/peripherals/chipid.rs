use log::warn;

use super::mods::{Address, Peripheral, Register};
use crate::constants::chipid::{CHIDR, CHIP_ID};
use crate::instruction::Instruction;
use crate::queue::QueueShutdown;
use crate::utils::Word;

/// Read-only chip identification register
pub struct ChipIdentification {
    core: u32, // Index of the core on a multi-core part
}

impl ChipIdentification {
    pub fn new(core: u32) -> Self {
        Self { core }
    }

    pub fn id(&self) -> Word {
        CHIP_ID | (self.core << 16)
    }
}

impl Peripheral for ChipIdentification {
    fn registers(&self) -> Vec<Register> {
        vec![Register::new("CHIDR", Address::x(CHIDR))]
    }

    fn read(&mut self, _address: Address, _inst: Instruction) -> Result<Word, QueueShutdown> {
        Ok(self.id())
    }

    fn write(&mut self, _address: Address, value: Word) -> Result<(), QueueShutdown> {
        warn!("Write attempt to read-only CHIDR: 0x{:06x}", value);
        Ok(())
    }
}
