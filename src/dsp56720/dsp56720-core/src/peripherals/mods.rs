use std::sync::Arc;

use log::warn;

use crate::dsp::{DspLink, MemArea, Vector};
use crate::instruction::Instruction;
use crate::queue::QueueShutdown;
use crate::utils::Word;

/// Location of a register on the memory bus
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub area: MemArea,
    pub offset: Word,
}

impl Address {
    pub const fn x(offset: Word) -> Self {
        Self {
            area: MemArea::X,
            offset,
        }
    }

    pub const fn y(offset: Word) -> Self {
        Self {
            area: MemArea::Y,
            offset,
        }
    }
}

/// Named bus port; reads and writes are handled by the owning peripheral
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Register {
    pub name: &'static str,
    pub address: Address,
}

impl Register {
    pub const fn new(name: &'static str, address: Address) -> Self {
        Self { name, address }
    }
}

/// Capability interface shared by every on-chip peripheral
pub trait Peripheral {
    /// Registers this peripheral answers on the bus
    fn registers(&self) -> Vec<Register>;

    /// Register read; `inst` is the instruction performing the access
    fn read(&mut self, address: Address, inst: Instruction) -> Result<Word, QueueShutdown>;
    fn write(&mut self, address: Address, value: Word) -> Result<(), QueueShutdown>;

    /// Advances the device by one retired instruction
    fn exec(&mut self) -> Result<(), QueueShutdown> {
        Ok(())
    }

    fn connect(&mut self, _link: Arc<dyn DspLink>) {}
    fn reset(&mut self) {}
    fn terminate(&mut self) {}
}

/// A peripheral's binding to the instruction core
#[derive(Clone, Default)]
pub struct DspHandle {
    link: Option<Arc<dyn DspLink>>,
}

impl DspHandle {
    pub fn connect(&mut self, link: Arc<dyn DspLink>) {
        self.link = Some(link);
    }

    pub fn interrupt(&self, vector: Vector) {
        match &self.link {
            Some(link) => link.inject_interrupt(vector),
            None => warn!("Interrupt 0x{:02x} dropped: no core connected", vector),
        }
    }

    pub fn instruction_counter(&self) -> u32 {
        self.link
            .as_ref()
            .map_or(0, |link| link.instruction_counter())
    }

    pub fn program_counter(&self) -> Word {
        self.link.as_ref().map_or(0, |link| link.program_counter())
    }
}
