use std::sync::Arc;

use crate::instruction::Instruction;
use crate::queue::QueueShutdown;
use crate::utils::Word;

/// Interrupt vector offset from the vector base address
pub type Vector = u32;

/// DSP address spaces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemArea {
    X,
    Y,
    P,
}

impl MemArea {
    pub fn name(self) -> &'static str {
        match self {
            MemArea::X => "(X)",
            MemArea::Y => "(Y)",
            MemArea::P => "(P)",
        }
    }
}

/// Execution-side view of the instruction core, used by the debugger and boot loader
pub trait Dsp {
    fn program_counter(&self) -> Word;
    fn set_program_counter(&mut self, pc: Word);

    /// Executes exactly one instruction
    fn exec(&mut self) -> Result<(), QueueShutdown>;

    fn write_memory(&mut self, area: MemArea, address: Word, value: Word);
}

/// Callbacks a peripheral makes into the core it is bound to
pub trait DspLink: Send + Sync {
    fn inject_interrupt(&self, vector: Vector);
    fn instruction_counter(&self) -> u32;
    fn program_counter(&self) -> Word;
}

/// Peripheral address space as seen by the instruction core
pub trait PeripheralBus {
    fn read(&mut self, area: MemArea, address: Word, inst: Instruction)
        -> Result<Word, QueueShutdown>;
    fn write(&mut self, area: MemArea, address: Word, value: Word) -> Result<(), QueueShutdown>;

    /// Called once per retired instruction
    fn exec(&mut self) -> Result<(), QueueShutdown>;

    /// Binds every peripheral to the core and resets it
    fn reset(&mut self, link: Arc<dyn DspLink>);
    fn terminate(&mut self);
}
