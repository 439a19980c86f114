use log::info;

use crate::dsp::{Dsp, MemArea};
use crate::peripherals::ShiHost;
use crate::queue::QueueShutdown;
use crate::utils::Word;

/// Loads a program streamed over the SHI receive FIFO.
///
/// The host sends the word count, the load address and then the program words.
/// They are written to P memory starting at the load address, which becomes the
/// program counter. Returns the load address.
pub fn boot<D: Dsp>(shi: &ShiHost, dsp: &mut D) -> Result<Word, QueueShutdown> {
    let count = shi.read_rx()?;
    let address = shi.read_rx()?;
    info!("Booting {} words at P:0x{:06x}", count, address);

    for offset in 0..count {
        let word = shi.read_rx()?;
        dsp.write_memory(MemArea::P, address.wrapping_add(offset), word);
    }

    dsp.set_program_counter(address);
    info!("Boot complete, pc 0x{:06x}", address);
    Ok(address)
}
