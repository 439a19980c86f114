//! Typed views over peripheral register words.
//!
//! A [`BitField`] holds the raw word of a register. Individual fields are read
//! through sub-views parametrised by their position in the word:
//!
//! * [`Bit`] - a single flag,
//! * [`Packed`] - a contiguous unsigned field,
//! * [`Set`] - a packed field whose bits are tested individually (channel masks).
//!
//! A sub-view is written back with `field |= view`, which clears exactly the
//! view's bits and merges the new value in. Sub-views never convert into a whole
//! [`BitField`], so overwriting a register with a single field does not compile:
//!
//! ```compile_fail
//! use dsp56720_core::bitfield::{Bit, BitField};
//!
//! let field: BitField = Bit::<3>::new(1).into();
//! ```
//!
//! Fields that do not fit in the 24-bit machine word are rejected when the view
//! is instantiated.

use std::ops::BitOrAssign;

use crate::constants::WORD_BITS;
use crate::utils::Word;

/// Raw register word
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitField(Word);

impl BitField {
    pub const fn new(value: Word) -> Self {
        Self(value)
    }

    pub const fn value(self) -> Word {
        self.0
    }

    /// Replaces the whole word
    pub fn set(&mut self, value: Word) {
        self.0 = value;
    }

    fn merge(&mut self, mask: Word, bits: Word) {
        self.0 = (self.0 & !mask) | (bits & mask);
    }
}

impl From<Word> for BitField {
    fn from(value: Word) -> Self {
        Self(value)
    }
}

impl From<BitField> for Word {
    fn from(field: BitField) -> Self {
        field.0
    }
}

/// Single flag at `OFFSET`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bit<const OFFSET: u32>(bool);

impl<const OFFSET: u32> Bit<OFFSET> {
    const CHECK: () = assert!(OFFSET < WORD_BITS, "bit lies outside the machine word");

    pub const MAX: Word = 1;
    pub const MASK: Word = 1 << OFFSET;

    /// Takes the lowest bit of `value`
    pub fn new(value: Word) -> Self {
        let () = Self::CHECK;
        Self(value & Self::MAX != 0)
    }

    pub fn get(self) -> bool {
        self.0
    }
}

impl<const OFFSET: u32> From<bool> for Bit<OFFSET> {
    fn from(flag: bool) -> Self {
        Self::new(flag as Word)
    }
}

impl<const OFFSET: u32> From<BitField> for Bit<OFFSET> {
    fn from(field: BitField) -> Self {
        Self::new((field.0 & Self::MASK) >> OFFSET)
    }
}

impl<const OFFSET: u32> From<Bit<OFFSET>> for bool {
    fn from(bit: Bit<OFFSET>) -> Self {
        bit.0
    }
}

impl<const OFFSET: u32> BitOrAssign<Bit<OFFSET>> for BitField {
    fn bitor_assign(&mut self, bit: Bit<OFFSET>) {
        self.merge(Bit::<OFFSET>::MASK, (bit.0 as Word) << OFFSET);
    }
}

/// Unsigned field of `WIDTH` bits starting at `OFFSET`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packed<const OFFSET: u32, const WIDTH: u32>(Word);

impl<const OFFSET: u32, const WIDTH: u32> Packed<OFFSET, WIDTH> {
    const CHECK: () = assert!(
        WIDTH > 0 && OFFSET + WIDTH <= WORD_BITS,
        "field lies outside the machine word"
    );

    pub const MAX: Word = (1 << WIDTH) - 1;
    pub const MASK: Word = Self::MAX << OFFSET;

    /// Truncates `value` to the field width
    pub fn new(value: Word) -> Self {
        let () = Self::CHECK;
        Self(value & Self::MAX)
    }

    pub fn get(self) -> Word {
        self.0
    }
}

impl<const OFFSET: u32, const WIDTH: u32> From<BitField> for Packed<OFFSET, WIDTH> {
    fn from(field: BitField) -> Self {
        Self::new((field.0 & Self::MASK) >> OFFSET)
    }
}

impl<const OFFSET: u32, const WIDTH: u32> From<Packed<OFFSET, WIDTH>> for Word {
    fn from(packed: Packed<OFFSET, WIDTH>) -> Self {
        packed.0
    }
}

impl<const OFFSET: u32, const WIDTH: u32> BitOrAssign<Packed<OFFSET, WIDTH>> for BitField {
    fn bitor_assign(&mut self, packed: Packed<OFFSET, WIDTH>) {
        self.merge(Packed::<OFFSET, WIDTH>::MASK, packed.0 << OFFSET);
    }
}

/// Packed field used as a per-position enable mask
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Set<const OFFSET: u32, const WIDTH: u32>(Word);

impl<const OFFSET: u32, const WIDTH: u32> Set<OFFSET, WIDTH> {
    const CHECK: () = assert!(
        WIDTH > 0 && OFFSET + WIDTH <= WORD_BITS,
        "set lies outside the machine word"
    );

    pub const MAX: Word = (1 << WIDTH) - 1;
    pub const MASK: Word = Self::MAX << OFFSET;

    pub fn new(value: Word) -> Self {
        let () = Self::CHECK;
        Self(value & Self::MAX)
    }

    pub fn get(self) -> Word {
        self.0
    }

    /// Is position `pos` of the set enabled
    pub fn test(self, pos: usize) -> bool {
        pos < WIDTH as usize && self.0 & (1 << pos) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl<const OFFSET: u32, const WIDTH: u32> From<BitField> for Set<OFFSET, WIDTH> {
    fn from(field: BitField) -> Self {
        Self::new((field.0 & Self::MASK) >> OFFSET)
    }
}

impl<const OFFSET: u32, const WIDTH: u32> From<Set<OFFSET, WIDTH>> for Word {
    fn from(set: Set<OFFSET, WIDTH>) -> Self {
        set.0
    }
}

impl<const OFFSET: u32, const WIDTH: u32> BitOrAssign<Set<OFFSET, WIDTH>> for BitField {
    fn bitor_assign(&mut self, set: Set<OFFSET, WIDTH>) {
        self.merge(Set::<OFFSET, WIDTH>::MASK, set.0 << OFFSET);
    }
}

#[cfg(test)]
mod bitfield_tests {
    use super::*;

    type Flag = Bit<13>;
    type Mode = Packed<12, 2>;
    type Enable = Set<0, 6>;

    #[test]
    fn test_bit_views() {
        let field = BitField::new(1 << 13);
        assert!(Flag::from(field).get());
        assert!(!Bit::<12>::from(field).get());
        assert!(Flag::new(3).get());
        assert!(!Flag::new(2).get());
    }

    #[test]
    fn test_bit_merge_touches_only_its_mask() {
        let mut field = BitField::new(0x00FF_FFFF);
        field |= Flag::from(false);
        assert_eq!(field.value(), 0x00FF_DFFF);
        field |= Flag::from(true);
        assert_eq!(field.value(), 0x00FF_FFFF);
    }

    #[test]
    fn test_packed_truncates_and_merges() {
        assert_eq!(Mode::new(0b111).get(), 0b11);

        let mut field = BitField::new(0x00A0_0FFF);
        field |= Mode::new(0b10);
        assert_eq!(field.value(), 0x00A0_2FFF);
        assert_eq!(Mode::from(field).get(), 0b10);

        field |= Mode::new(0);
        assert_eq!(field.value(), 0x00A0_0FFF);
    }

    #[test]
    fn test_set_positions() {
        let field = BitField::new(0b0010_0101);
        let enabled = Enable::from(field);
        assert!(enabled.test(0));
        assert!(!enabled.test(1));
        assert!(enabled.test(2));
        assert!(enabled.test(5));
        assert!(!enabled.test(6));
        assert!(!enabled.test(64));
        assert!(!enabled.is_empty());
        assert!(Enable::new(0b1100_0000).is_empty());
    }

    #[test]
    fn test_raw_assignment_replaces_word() {
        let mut field = BitField::from(0x12);
        field.set(0x34);
        assert_eq!(Word::from(field), 0x34);
    }
}
