/// Kind of instruction performing a peripheral access.
///
/// Register handlers only need to tell bit tests apart from everything else:
/// a bit test must observe a FIFO without consuming it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    BtstPp, // BTST #n,pp
    BtstD,  // BTST #n,D
    BtstQq, // BTST #n,qq
    BtstEa, // BTST #n,ea
    BtstAa, // BTST #n,aa
    Other,
}

impl Instruction {
    pub fn is_bit_test(self) -> bool {
        matches!(
            self,
            Instruction::BtstPp
                | Instruction::BtstD
                | Instruction::BtstQq
                | Instruction::BtstEa
                | Instruction::BtstAa
        )
    }
}

impl Default for Instruction {
    fn default() -> Self {
        Instruction::Other
    }
}
