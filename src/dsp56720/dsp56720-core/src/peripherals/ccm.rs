use log::{debug, error};

use super::mods::{Address, Peripheral, Register};
use crate::constants::ccm::{EMBC, ODBC};
use crate::instruction::Instruction;
use crate::queue::QueueShutdown;
use crate::utils::Word;

/// Chip configuration module: external memory burst control
#[derive(Default)]
pub struct ChipConfigurationModule {
    embc: Word, // External memory burst control
}

impl ChipConfigurationModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Peripheral for ChipConfigurationModule {
    fn registers(&self) -> Vec<Register> {
        vec![
            Register::new("EMBC", Address::y(EMBC)),
            Register::new("ODBC", Address::y(ODBC)),
        ]
    }

    fn read(&mut self, address: Address, _inst: Instruction) -> Result<Word, QueueShutdown> {
        let value = match address.offset {
            EMBC => self.embc,
            // Debug/burst control is not modelled
            ODBC => 0,
            _ => {
                error!("Invalid CCM read at: 0x{:06x}", address.offset);
                0
            }
        };
        Ok(value)
    }

    fn write(&mut self, address: Address, value: Word) -> Result<(), QueueShutdown> {
        match address.offset {
            EMBC => {
                debug!("Write CCM EMBC 0x{:06x}", value);
                self.embc = value;
            }
            ODBC => {}
            _ => error!("Invalid CCM write at: 0x{:06x}", address.offset),
        }
        Ok(())
    }
}
