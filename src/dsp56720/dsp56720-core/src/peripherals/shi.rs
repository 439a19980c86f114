use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{debug, info};

use super::mods::{Address, DspHandle, Peripheral, Register};
use crate::bitfield::{Bit, BitField, Packed};
use crate::constants::shi::{HCKR, HCSR, HRX, HSAR, HTX};
use crate::constants::vectors;
use crate::dsp::DspLink;
use crate::instruction::Instruction;
use crate::queue::{QueueShutdown, WordQueue};
use crate::utils::{mask_word, Word};

// HCSR fields
pub type Hen = Bit<0>; // Enable
pub type Hi2c = Bit<1>; // I2C mode
pub type Hm = Packed<2, 2>; // Serial word length
pub type Hckfr = Bit<4>; // Clock freeze
pub type Hfifo = Bit<5>; // FIFO enable
pub type Hmst = Bit<6>; // Master mode
pub type Hrqe = Packed<7, 2>; // Host request enable
pub type Hidle = Bit<9>; // Idle
pub type Hbie = Bit<10>; // Bus error interrupt enable
pub type Htie = Bit<11>; // Transmit interrupt enable
pub type Hrie = Packed<12, 2>; // Receive interrupt enable
pub type Htue = Bit<14>; // Transmit underrun error
pub type Htde = Bit<15>; // Transmit data empty
pub type Hrne = Bit<17>; // Receive FIFO not empty
pub type Hrff = Bit<19>; // Receive FIFO full
pub type Hroe = Bit<20>; // Receive overrun error
pub type Hber = Bit<21>; // Bus error
pub type Hbusy = Bit<22>; // Busy

/// Receive interrupt policy selected by HRIE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveInterruptMode {
    Disabled,
    NotEmpty,
    Reserved,
    Full,
}

impl From<Hrie> for ReceiveInterruptMode {
    fn from(hrie: Hrie) -> Self {
        match hrie.get() {
            0 => ReceiveInterruptMode::Disabled,
            1 => ReceiveInterruptMode::NotEmpty,
            2 => ReceiveInterruptMode::Reserved,
            _ => ReceiveInterruptMode::Full,
        }
    }
}

// State touched by both the execution thread and host threads
struct Shared {
    hcsr: AtomicU32,
    rx: WordQueue,           // Host to DSP
    tx: WordQueue,           // DSP to host
    pending_rx: AtomicU32,   // Receive interrupts not yet delivered
    pending_tx: AtomicU32,   // Transmit interrupts not yet delivered
}

impl Shared {
    fn hcsr(&self) -> BitField {
        BitField::new(self.hcsr.load(Ordering::Acquire))
    }

    fn receive(&self, word: Word) -> Result<(), QueueShutdown> {
        self.rx.push(mask_word(word))?;

        let hcsr = self.hcsr();
        if Hen::from(hcsr).get() && Hrie::from(hcsr).get() != 0 {
            self.pending_rx.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    fn shutdown(&self) {
        self.rx.shutdown();
        self.tx.shutdown();
    }
}

/// Host-side endpoint of the serial host interface
#[derive(Clone)]
pub struct ShiHost {
    shared: Arc<Shared>,
}

impl ShiHost {
    /// Sends words to the DSP, waiting for FIFO room
    pub fn write_rx(&self, words: &[Word]) -> Result<(), QueueShutdown> {
        for &word in words {
            self.shared.receive(word)?;
        }
        Ok(())
    }

    /// Consuming read of the receive FIFO, used while booting
    pub fn read_rx(&self) -> Result<Word, QueueShutdown> {
        self.shared.rx.pop()
    }

    /// Next word transmitted by the DSP
    pub fn read_tx(&self) -> Result<Word, QueueShutdown> {
        self.shared.tx.pop()
    }

    pub fn try_read_tx(&self) -> Result<Option<Word>, QueueShutdown> {
        self.shared.tx.try_pop()
    }

    pub fn shutdown(&self) {
        self.shared.shutdown();
    }
}

/// Serial host interface: word exchange with the host plus FIFO interrupts
pub struct SerialHostInterface {
    shared: Arc<Shared>,
    dsp: DspHandle,
}

impl SerialHostInterface {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                hcsr: AtomicU32::new(0),
                rx: WordQueue::new(),
                tx: WordQueue::new(),
                pending_rx: AtomicU32::new(0),
                pending_tx: AtomicU32::new(0),
            }),
            dsp: DspHandle::default(),
        }
    }

    pub fn host(&self) -> ShiHost {
        ShiHost {
            shared: self.shared.clone(),
        }
    }

    pub fn pending_rx(&self) -> u32 {
        self.shared.pending_rx.load(Ordering::Acquire)
    }

    pub fn pending_tx(&self) -> u32 {
        self.shared.pending_tx.load(Ordering::Acquire)
    }

    fn read_rx(&self, inst: Instruction) -> Result<Word, QueueShutdown> {
        let rx = &self.shared.rx;
        if rx.is_empty() {
            debug!("SHI empty HRX read at {:06x}", self.dsp.program_counter());
            return Ok(0);
        }

        // Bit tests poll the FIFO without draining it
        if inst.is_bit_test() {
            Ok(rx.front().unwrap_or(0))
        } else {
            Ok(rx.try_pop()?.unwrap_or(0))
        }
    }

    fn write_tx(&self, value: Word) -> Result<(), QueueShutdown> {
        self.shared.tx.push(value)?;
        self.shared.pending_tx.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn read_status_control_register(&self) -> Word {
        let rx = &self.shared.rx;
        let mut hcsr = self.shared.hcsr();
        hcsr |= Hrne::from(!rx.is_empty());
        hcsr |= Hrff::from(rx.is_full());
        self.shared.hcsr.store(hcsr.value(), Ordering::Release);
        hcsr.value()
    }

    fn write_status_control_register(&self, value: Word) {
        let hcsr = BitField::new(value);
        debug!(
            "Write SHI HCSR 0x{:06x} HEN={} HRIE={} HTIE={}",
            value,
            Hen::from(hcsr).get(),
            Hrie::from(hcsr).get(),
            Htie::from(hcsr).get()
        );
        self.shared.hcsr.store(value, Ordering::Release);
    }
}

impl Default for SerialHostInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for SerialHostInterface {
    fn registers(&self) -> Vec<Register> {
        vec![
            Register::new("HRX", Address::x(HRX)),
            Register::new("HTX", Address::x(HTX)),
            Register::new("HSAR", Address::x(HSAR)),
            Register::new("HCSR", Address::x(HCSR)),
            Register::new("HCKR", Address::x(HCKR)),
        ]
    }

    fn read(&mut self, address: Address, inst: Instruction) -> Result<Word, QueueShutdown> {
        match address.offset {
            HRX => self.read_rx(inst),
            HCSR => Ok(self.read_status_control_register()),
            _ => Ok(0),
        }
    }

    fn write(&mut self, address: Address, value: Word) -> Result<(), QueueShutdown> {
        match address.offset {
            HTX => self.write_tx(value)?,
            HCSR => self.write_status_control_register(value),
            _ => {}
        }
        Ok(())
    }

    fn exec(&mut self) -> Result<(), QueueShutdown> {
        let shared = &self.shared;
        let hcsr = shared.hcsr();
        if !Hen::from(hcsr).get() {
            return Ok(());
        }

        let mode = ReceiveInterruptMode::from(Hrie::from(hcsr));
        if mode != ReceiveInterruptMode::Disabled && shared.pending_rx.load(Ordering::Acquire) > 0
        {
            shared.pending_rx.fetch_sub(1, Ordering::AcqRel);

            match mode {
                ReceiveInterruptMode::NotEmpty if !shared.rx.is_empty() => {
                    self.dsp.interrupt(vectors::SHI_RECEIVE_FIFO_NOT_EMPTY)
                }
                ReceiveInterruptMode::Full if shared.rx.is_full() => {
                    self.dsp.interrupt(vectors::SHI_RECEIVE_FIFO_FULL)
                }
                _ => {}
            }
        } else if Htie::from(hcsr).get() && shared.pending_tx.load(Ordering::Acquire) > 0 {
            shared.pending_tx.fetch_sub(1, Ordering::AcqRel);
            self.dsp.interrupt(vectors::SHI_TRANSMIT_DATA);
        }
        Ok(())
    }

    fn connect(&mut self, link: Arc<dyn DspLink>) {
        self.dsp.connect(link);
    }

    fn terminate(&mut self) {
        info!("SHI terminating");
        self.shared.shutdown();
    }
}
