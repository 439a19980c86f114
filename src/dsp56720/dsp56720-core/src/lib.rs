pub mod bitfield;
pub mod boot;
pub mod constants;
pub mod debugger;
pub mod dsp;
pub mod instruction;
pub mod peripherals;
pub mod queue;
pub mod utils;

#[cfg(test)]
mod testing;

pub use boot::boot;
pub use debugger::{Debugger, Step};
pub use dsp::{Dsp, DspLink, MemArea, PeripheralBus, Vector};
pub use instruction::Instruction;
pub use peripherals::Peripherals;
pub use queue::{BoundedQueue, QueueShutdown, WordQueue};
pub use utils::Word;
