use crate::constants::address_space::{IO_BANKS, IO_FIRST, IO_SIZE};
use crate::dsp::MemArea;
use crate::utils::{mask_word, Word};

/// Plain storage behind peripheral-window addresses no device claims.
/// X and Y each own one bank; P has none.
pub struct IoMemory {
    memory_banks: [[Word; IO_SIZE]; IO_BANKS],
}

impl IoMemory {
    pub fn new() -> Self {
        Self {
            memory_banks: [[0; IO_SIZE]; IO_BANKS],
        }
    }

    /// Bank and slot of `offset`, if backed
    fn locate(area: MemArea, offset: Word) -> Option<(usize, usize)> {
        let bank = match area {
            MemArea::X => 0,
            MemArea::Y => 1,
            MemArea::P => return None,
        };
        let slot = offset.wrapping_sub(IO_FIRST) as usize;
        if slot < IO_SIZE {
            Some((bank, slot))
        } else {
            None
        }
    }

    pub fn contains(area: MemArea, offset: Word) -> bool {
        Self::locate(area, offset).is_some()
    }

    pub fn read(&self, area: MemArea, offset: Word) -> Option<Word> {
        Self::locate(area, offset).map(|(bank, slot)| self.memory_banks[bank][slot])
    }

    /// Stores the 24-bit word; false if the address is not backed
    pub fn write(&mut self, area: MemArea, offset: Word, value: Word) -> bool {
        match Self::locate(area, offset) {
            Some((bank, slot)) => {
                self.memory_banks[bank][slot] = mask_word(value);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.memory_banks = [[0; IO_SIZE]; IO_BANKS];
    }
}

impl Default for IoMemory {
    fn default() -> Self {
        Self::new()
    }
}
