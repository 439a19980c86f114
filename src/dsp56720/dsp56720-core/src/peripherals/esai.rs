use std::array;
use std::sync::Arc;

use log::{debug, info, warn};

use super::cgm::SampleClock;
use super::mods::{Address, DspHandle, Peripheral, Register};
use crate::bitfield::{Bit, BitField, Set};
use crate::constants::esai::*;
use crate::constants::vectors;
use crate::dsp::DspLink;
use crate::instruction::Instruction;
use crate::queue::{QueueShutdown, WordQueue};
use crate::utils::{delta, Word};

// SAISR fields
pub type Tfs = Bit<13>; // Transmit frame sync
pub type Tue = Bit<14>; // Transmit underrun error
pub type Tde = Bit<15>; // Transmit data register empty

// RCR fields
pub type Re = Set<0, 4>; // Receive enable

// TCR fields
pub type Te = Set<0, 6>; // Transmit enable
pub type Teie = Bit<20>; // Transmit exception interrupt enable
pub type Tie = Bit<22>; // Transmit interrupt enable
pub type Tlie = Bit<23>; // Transmit last slot interrupt enable

const TX_NAMES: [&str; TX_CHANNELS] = ["TX0", "TX1", "TX2", "TX3", "TX4", "TX5"];
const RX_NAMES: [&str; RX_CHANNELS] = ["RX0", "RX1", "RX2", "RX3"];

/// Host-side endpoints of the audio channels
#[derive(Clone)]
pub struct EsaiStreams {
    inputs: [Arc<WordQueue>; RX_CHANNELS],  // Host to DSP
    outputs: [Arc<WordQueue>; TX_CHANNELS], // DSP to host
}

impl EsaiStreams {
    fn new() -> Self {
        Self {
            inputs: array::from_fn(|_| Arc::new(WordQueue::new())),
            outputs: array::from_fn(|_| Arc::new(WordQueue::new())),
        }
    }

    pub fn input(&self, channel: usize) -> Option<Arc<WordQueue>> {
        self.inputs.get(channel).cloned()
    }

    pub fn output(&self, channel: usize) -> Option<Arc<WordQueue>> {
        self.outputs.get(channel).cloned()
    }

    /// Queues one sample for input `channel`, waiting for room
    pub fn write_input(&self, channel: usize, word: Word) -> Result<(), QueueShutdown> {
        match self.inputs.get(channel) {
            Some(queue) => queue.push(word),
            None => {
                warn!("ESAI input {} does not exist", channel);
                Ok(())
            }
        }
    }

    /// Next sample from output `channel`, waiting for one
    pub fn read_output(&self, channel: usize) -> Result<Word, QueueShutdown> {
        match self.outputs.get(channel) {
            Some(queue) => queue.pop(),
            None => {
                warn!("ESAI output {} does not exist", channel);
                Ok(0)
            }
        }
    }

    pub fn shutdown(&self) {
        for queue in self.inputs.iter().chain(self.outputs.iter()) {
            queue.shutdown();
        }
    }
}

/// Enhanced serial audio interface.
///
/// Samples move once per sample period of the [`SampleClock`], measured in
/// core instruction cycles. Each transfer pushes the last word written to every
/// enabled TX register onto its output stream and latches one word per enabled
/// input stream into the RX registers.
pub struct EnhancedSerialAudioInterface {
    clock: SampleClock,
    dsp: DspHandle,
    streams: EsaiStreams,

    tx: [Word; TX_CHANNELS], // Words written by the DSP
    rx: [Word; RX_CHANNELS], // Words for the DSP to read
    has_read_status: bool,   // SAISR read since TUE was set
    cycles_since_write: u32, // Accumulated cycles not yet spent on a transfer
    written_tx: Word,        // TX registers written in this period
    last_clock: u32,         // Instruction counter at the previous tick

    sr: BitField,
    tcr: BitField,
    rcr: BitField,
    cr: Word,
    tccr: Word,
    rccr: Word,
}

impl EnhancedSerialAudioInterface {
    pub fn new(clock: SampleClock) -> Self {
        Self {
            clock,
            dsp: DspHandle::default(),
            streams: EsaiStreams::new(),
            tx: [0; TX_CHANNELS],
            rx: [0; RX_CHANNELS],
            has_read_status: false,
            cycles_since_write: 0,
            written_tx: 0,
            last_clock: 0,
            sr: BitField::default(),
            tcr: BitField::default(),
            rcr: BitField::default(),
            cr: 0,
            tccr: 0,
            rccr: 0,
        }
    }

    pub fn streams(&self) -> EsaiStreams {
        self.streams.clone()
    }

    /// SAISR without the read side effect
    pub fn status(&self) -> Word {
        self.sr.value()
    }

    fn input_enabled(&self, index: usize) -> bool {
        Re::from(self.rcr).test(index)
    }

    fn output_enabled(&self, index: usize) -> bool {
        Te::from(self.tcr).test(index)
    }

    pub fn read_rx(&self, index: usize) -> Word {
        if !self.input_enabled(index) {
            return 0;
        }
        self.rx[index]
    }

    pub fn write_tx(&mut self, index: usize, value: Word) {
        if !self.output_enabled(index) {
            return;
        }

        self.tx[index] = value;
        self.written_tx |= 1 << index;

        if self.written_tx == Te::from(self.tcr).get() {
            if self.has_read_status {
                self.sr |= Tue::from(false);
            }
            self.sr |= Tde::from(false);
        }
    }

    fn read_status_register(&mut self) -> Word {
        self.has_read_status = true;
        self.sr.value()
    }

    fn write_status_register(&mut self, value: Word) {
        debug!("Write ESAI SR 0x{:06x}", value);
        self.sr.set(value);
    }

    fn write_receive_control_register(&mut self, value: Word) {
        debug!(
            "Write ESAI RCR 0x{:06x} RE={:04b}",
            value,
            Re::new(value).get()
        );
        self.rcr.set(value);
    }

    fn write_transmit_control_register(&mut self, value: Word) {
        self.sr |= Tue::from(false);
        debug!(
            "Write ESAI TCR 0x{:06x} TE={:06b}",
            value,
            Te::new(value).get()
        );

        let was_idle = Te::from(self.tcr).is_empty();
        self.tcr.set(value);

        // Pacing starts from the moment transmission is enabled
        if was_idle && !Te::from(self.tcr).is_empty() {
            self.last_clock = self.dsp.instruction_counter();
            self.cycles_since_write = 0;
        }
    }

    fn transfer(&mut self) -> Result<(), QueueShutdown> {
        for (index, output) in self.streams.outputs.iter().enumerate() {
            if self.output_enabled(index) {
                output.push(self.tx[index])?;
            }
        }

        // Inputs never stall the core; an empty stream reads as silence
        for (index, input) in self.streams.inputs.iter().enumerate() {
            if self.input_enabled(index) {
                self.rx[index] = input.try_pop()?.unwrap_or(0);
            }
        }
        Ok(())
    }
}

impl Peripheral for EnhancedSerialAudioInterface {
    fn registers(&self) -> Vec<Register> {
        let mut registers = Vec::with_capacity(TX_CHANNELS + RX_CHANNELS + 6);
        for (index, name) in RX_NAMES.iter().enumerate() {
            registers.push(Register::new(*name, Address::x(RX0 + index as u32)));
        }
        for (index, name) in TX_NAMES.iter().enumerate() {
            registers.push(Register::new(*name, Address::x(TX0 + index as u32)));
        }
        registers.extend_from_slice(&[
            Register::new("SAISR", Address::x(SAISR)),
            Register::new("SAICR", Address::x(SAICR)),
            Register::new("RCR", Address::x(RCR)),
            Register::new("RCCR", Address::x(RCCR)),
            Register::new("TCR", Address::x(TCR)),
            Register::new("TCCR", Address::x(TCCR)),
        ]);
        registers
    }

    fn read(&mut self, address: Address, _inst: Instruction) -> Result<Word, QueueShutdown> {
        let value = match address.offset {
            RX0..=RX3 => self.read_rx((address.offset - RX0) as usize),
            TX0..=TX5 => 0,
            SAISR => self.read_status_register(),
            SAICR => {
                debug!("Read ESAI CR");
                self.cr
            }
            RCR => self.rcr.value(),
            TCR => self.tcr.value(),
            // Clock control registers are write-only here
            RCCR | TCCR => 0,
            _ => {
                warn!("Invalid ESAI read at: 0x{:06x}", address.offset);
                0
            }
        };
        Ok(value)
    }

    fn write(&mut self, address: Address, value: Word) -> Result<(), QueueShutdown> {
        match address.offset {
            TX0..=TX5 => self.write_tx((address.offset - TX0) as usize, value),
            RX0..=RX3 => {}
            SAISR => self.write_status_register(value),
            SAICR => {
                debug!("Write ESAI CR 0x{:06x}", value);
                self.cr = value;
            }
            RCR => self.write_receive_control_register(value),
            TCR => self.write_transmit_control_register(value),
            RCCR => {
                debug!("Write ESAI RCCR 0x{:06x}", value);
                self.rccr = value;
            }
            TCCR => {
                debug!("Write ESAI TCCR 0x{:06x}", value);
                self.tccr = value;
            }
            _ => warn!("Invalid ESAI write at: 0x{:06x}", address.offset),
        }
        Ok(())
    }

    fn exec(&mut self) -> Result<(), QueueShutdown> {
        if Te::from(self.tcr).is_empty() {
            return Ok(());
        }

        let clock = self.dsp.instruction_counter();
        let diff = delta(clock, self.last_clock);
        self.last_clock = clock;

        self.cycles_since_write = self.cycles_since_write.saturating_add(diff);
        let period = self.clock.cycles_per_sample().max(1);
        if self.cycles_since_write < period {
            return Ok(());
        }

        // Time to move samples; the remainder carries into the next period
        self.cycles_since_write -= period;
        self.transfer()?;

        let frame_sync = !Tfs::from(self.sr).get();
        self.sr |= Tfs::from(frame_sync);

        // Underrun does not change which transmit interrupt fires
        if Tie::from(self.tcr).get() {
            self.dsp.interrupt(vectors::ESAI_TRANSMIT_DATA);
        }
        if frame_sync && Tlie::from(self.tcr).get() {
            self.dsp.interrupt(vectors::ESAI_TRANSMIT_LAST_SLOT);
        }

        self.sr |= Tue::from(true);
        self.sr |= Tde::from(true);
        self.written_tx = 0;
        self.has_read_status = false;
        Ok(())
    }

    fn connect(&mut self, link: Arc<dyn DspLink>) {
        self.dsp.connect(link);
    }

    fn reset(&mut self) {
        self.last_clock = self.dsp.instruction_counter();
        self.cycles_since_write = 0;
    }

    fn terminate(&mut self) {
        info!("ESAI terminating");
        self.streams.shutdown();
    }
}

#[cfg(test)]
mod esai_tests {
    use super::*;
    use crate::testing::RecordingLink;

    const PERIOD: u32 = 10;
    const ALL_OUTPUTS: Word = 0b11_1111;
    const TIE: Word = 1 << 22;
    const TLIE: Word = 1 << 23;

    fn connected() -> (EnhancedSerialAudioInterface, Arc<RecordingLink>) {
        let link = Arc::new(RecordingLink::default());
        let mut esai = EnhancedSerialAudioInterface::new(SampleClock::new(PERIOD));
        esai.connect(link.clone());
        (esai, link)
    }

    fn tfs(esai: &EnhancedSerialAudioInterface) -> bool {
        Tfs::from(BitField::new(esai.status())).get()
    }

    #[test]
    fn test_transfers_once_per_period() {
        let (mut esai, link) = connected();
        esai.write(Address::x(TCR), ALL_OUTPUTS).unwrap();
        let streams = esai.streams();

        let periods = 5;
        let mut toggles = 0;
        for cycle in 0..periods * PERIOD {
            if cycle % PERIOD == 0 {
                for channel in 0..TX_CHANNELS {
                    let value = cycle + channel as u32;
                    esai.write(Address::x(TX0 + channel as u32), value).unwrap();
                }
            }

            let before = tfs(&esai);
            link.advance(1);
            esai.exec().unwrap();
            if tfs(&esai) != before {
                toggles += 1;
            }
        }

        assert_eq!(toggles, periods);
        for channel in 0..TX_CHANNELS {
            let output = streams.output(channel).unwrap();
            assert_eq!(output.len(), periods as usize);
            for period in 0..periods {
                assert_eq!(output.pop(), Ok(period * PERIOD + channel as u32));
            }
        }
    }

    #[test]
    fn test_remainder_carries_forward() {
        let (mut esai, link) = connected();
        esai.write(Address::x(TCR), 0b1).unwrap();
        let output = esai.streams().output(0).unwrap();

        link.advance(PERIOD * 2 + 5);
        esai.exec().unwrap();
        assert_eq!(output.len(), 1);
        esai.exec().unwrap();
        assert_eq!(output.len(), 2);
        esai.exec().unwrap();
        assert_eq!(output.len(), 2);
        link.advance(PERIOD - 5);
        esai.exec().unwrap();
        assert_eq!(output.len(), 3);
    }

    #[test]
    fn test_idle_without_enabled_outputs() {
        let (mut esai, link) = connected();
        esai.write(Address::x(TCR), TIE).unwrap();
        link.advance(PERIOD * 4);
        esai.exec().unwrap();

        let streams = esai.streams();
        for channel in 0..TX_CHANNELS {
            assert!(streams.output(channel).unwrap().is_empty());
        }
        assert!(link.interrupts().is_empty());
        assert_eq!(esai.status(), 0);
    }

    #[test]
    fn test_disabled_channel_never_queues() {
        let (mut esai, link) = connected();
        esai.write(Address::x(TCR), 0b01).unwrap();
        esai.write(Address::x(TX0), 0xAA).unwrap();
        esai.write(Address::x(TX0 + 1), 0xBB).unwrap();

        for _ in 0..3 {
            link.advance(PERIOD);
            esai.exec().unwrap();
        }

        let streams = esai.streams();
        assert_eq!(streams.output(0).unwrap().len(), 3);
        assert!(streams.output(1).unwrap().is_empty());
        assert_eq!(streams.read_output(0), Ok(0xAA));
    }

    #[test]
    fn test_receive_latches_without_blocking() {
        let (mut esai, link) = connected();
        esai.write(Address::x(TCR), 0b1).unwrap();
        esai.write(Address::x(RCR), 0b0101).unwrap();

        let streams = esai.streams();
        streams.write_input(0, 42).unwrap();
        streams.write_input(1, 43).unwrap();
        streams.write_input(2, 44).unwrap();

        link.advance(PERIOD);
        esai.exec().unwrap();
        assert_eq!(esai.read(Address::x(RX0), Instruction::Other), Ok(42));
        assert_eq!(esai.read(Address::x(RX0 + 1), Instruction::Other), Ok(0));
        assert_eq!(esai.read(Address::x(RX0 + 2), Instruction::Other), Ok(44));
        assert_eq!(streams.input(1).unwrap().len(), 1);

        // Empty input streams read as silence
        link.advance(PERIOD);
        esai.exec().unwrap();
        assert_eq!(esai.read(Address::x(RX0), Instruction::Other), Ok(0));
    }

    #[test]
    fn test_status_flags() {
        let (mut esai, link) = connected();
        esai.write(Address::x(TCR), 0b11).unwrap();
        link.advance(PERIOD);
        esai.exec().unwrap();

        let status = BitField::new(esai.status());
        assert!(Tue::from(status).get());
        assert!(Tde::from(status).get());

        // Every enabled channel written: data no longer empty, underrun sticks until SAISR is read
        esai.write(Address::x(TX0), 1).unwrap();
        let status = BitField::new(esai.status());
        assert!(Tde::from(status).get());
        esai.write(Address::x(TX0 + 1), 2).unwrap();
        let status = BitField::new(esai.status());
        assert!(!Tde::from(status).get());
        assert!(Tue::from(status).get());

        link.advance(PERIOD);
        esai.exec().unwrap();
        esai.read(Address::x(SAISR), Instruction::Other).unwrap();
        esai.write(Address::x(TX0), 1).unwrap();
        esai.write(Address::x(TX0 + 1), 2).unwrap();
        let status = BitField::new(esai.status());
        assert!(!Tde::from(status).get());
        assert!(!Tue::from(status).get());
    }

    #[test]
    fn test_tcr_write_clears_underrun() {
        let (mut esai, link) = connected();
        esai.write(Address::x(TCR), 0b1).unwrap();
        link.advance(PERIOD);
        esai.exec().unwrap();
        assert!(Tue::from(BitField::new(esai.status())).get());

        esai.write(Address::x(TCR), 0b1).unwrap();
        assert!(!Tue::from(BitField::new(esai.status())).get());
        assert_eq!(esai.read(Address::x(TCR), Instruction::Other), Ok(0b1));
    }

    #[test]
    fn test_transmit_interrupts() {
        let (mut esai, link) = connected();
        esai.write(Address::x(TCR), 0b1 | TIE | TLIE).unwrap();

        for _ in 0..4 {
            link.advance(PERIOD);
            esai.exec().unwrap();
        }

        assert_eq!(
            link.interrupts(),
            vec![
                vectors::ESAI_TRANSMIT_DATA,
                vectors::ESAI_TRANSMIT_LAST_SLOT,
                vectors::ESAI_TRANSMIT_DATA,
                vectors::ESAI_TRANSMIT_DATA,
                vectors::ESAI_TRANSMIT_LAST_SLOT,
                vectors::ESAI_TRANSMIT_DATA,
            ]
        );
    }

    #[test]
    fn test_pacing_starts_when_enabled() {
        let (mut esai, link) = connected();
        link.advance(PERIOD * 100);
        esai.exec().unwrap();

        esai.write(Address::x(TCR), 0b1).unwrap();
        esai.exec().unwrap();
        assert!(esai.streams().output(0).unwrap().is_empty());
    }

    #[test]
    fn test_counter_wraparound() {
        let (mut esai, link) = connected();
        link.set_counter(u32::MAX - 3);
        esai.write(Address::x(TCR), 0b1).unwrap();
        link.set_counter(PERIOD - 4);
        esai.exec().unwrap();
        assert_eq!(esai.streams().output(0).unwrap().len(), 1);
    }

    #[test]
    fn test_terminate_shuts_streams() {
        let (mut esai, _link) = connected();
        let streams = esai.streams();
        esai.terminate();
        assert_eq!(streams.write_input(0, 1), Err(QueueShutdown));
        assert_eq!(streams.read_output(5), Err(QueueShutdown));
    }

    #[test]
    fn test_out_of_range_channels() {
        let (mut esai, _link) = connected();
        esai.write_tx(TX_CHANNELS, 1);
        assert_eq!(esai.read_rx(RX_CHANNELS), 0);
        assert!(esai.streams().input(RX_CHANNELS).is_none());
        assert_eq!(esai.streams().write_input(RX_CHANNELS, 1), Ok(()));
    }
}
