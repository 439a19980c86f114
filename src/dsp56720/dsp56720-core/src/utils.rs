use crate::constants::WORD_MASK;

/// 24-bit DSP machine word, carried in the low bits of a u32
pub type Word = u32;

// Truncates a host value to a DSP word
pub fn mask_word(value: u32) -> Word {
    value & WORD_MASK
}

// Cycles elapsed between two samples of a free-running 32-bit counter
pub fn delta(now: u32, before: u32) -> u32 {
    now.wrapping_sub(before)
}
