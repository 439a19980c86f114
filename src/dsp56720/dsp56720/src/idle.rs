use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, trace};

use dsp56720_core::utils::mask_word;
use dsp56720_core::{Dsp, DspLink, MemArea, PeripheralBus, QueueShutdown, Vector, Word};

// Core state the peripherals can observe from their side
struct IdleLink {
    interrupts: Sender<Vector>, // Interrupt request line
    counter: AtomicU32,         // Retired instructions
    pc: AtomicU32,
}

impl DspLink for IdleLink {
    fn inject_interrupt(&self, vector: Vector) {
        if self.interrupts.send(vector).is_err() {
            debug!("Interrupt 0x{:02x} lost: core gone", vector);
        }
    }

    fn instruction_counter(&self) -> u32 {
        self.counter.load(Ordering::Acquire)
    }

    fn program_counter(&self) -> Word {
        self.pc.load(Ordering::Acquire)
    }
}

/// Stand-in execution core: every instruction is a one-cycle no-op.
/// Drives the peripheral bus once per instruction and logs the interrupts it receives.
pub struct IdleCore<B> {
    link: Arc<IdleLink>,
    interrupts: Receiver<Vector>,
    program: HashMap<Word, Word>, // P memory, sparse
    bus: B,
}

impl<B: PeripheralBus> IdleCore<B> {
    pub fn new(mut bus: B) -> Self {
        let (sender, receiver) = unbounded();
        let link = Arc::new(IdleLink {
            interrupts: sender,
            counter: AtomicU32::new(0),
            pc: AtomicU32::new(0),
        });
        bus.reset(link.clone());

        Self {
            link,
            interrupts: receiver,
            program: HashMap::new(),
            bus,
        }
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn instruction_counter(&self) -> u32 {
        self.link.instruction_counter()
    }

    pub fn program_word(&self, address: Word) -> Word {
        self.program.get(&address).copied().unwrap_or(0)
    }
}

impl<B: PeripheralBus> Dsp for IdleCore<B> {
    fn program_counter(&self) -> Word {
        self.link.program_counter()
    }

    fn set_program_counter(&mut self, pc: Word) {
        self.link.pc.store(mask_word(pc), Ordering::Release);
    }

    fn exec(&mut self) -> Result<(), QueueShutdown> {
        let pc = self.program_counter();
        for vector in self.interrupts.try_iter() {
            debug!("Interrupt 0x{:02x} at pc 0x{:06x}", vector, pc);
        }

        trace!("Exec 0x{:06x}: 0x{:06x}", pc, self.program_word(pc));
        self.set_program_counter(pc.wrapping_add(1));
        self.link.counter.fetch_add(1, Ordering::AcqRel);
        self.bus.exec()
    }

    fn write_memory(&mut self, area: MemArea, address: Word, value: Word) {
        match area {
            MemArea::P => {
                self.program.insert(mask_word(address), mask_word(value));
            }
            _ => {
                if let Err(QueueShutdown) = self.bus.write(area, address, value) {
                    debug!("Write to {}:0x{:06x} after shutdown", area.name(), address);
                }
            }
        }
    }
}
