// Core link double shared by the unit tests
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::dsp::{DspLink, Vector};
use crate::utils::Word;

#[derive(Default)]
pub struct RecordingLink {
    interrupts: Mutex<Vec<Vector>>,
    counter: AtomicU32,
    pc: AtomicU32,
}

impl RecordingLink {
    pub fn interrupts(&self) -> Vec<Vector> {
        self.interrupts.lock().unwrap().clone()
    }

    pub fn advance(&self, cycles: u32) {
        self.counter.fetch_add(cycles, Ordering::SeqCst);
    }

    pub fn set_counter(&self, value: u32) {
        self.counter.store(value, Ordering::SeqCst);
    }

    pub fn set_pc(&self, pc: Word) {
        self.pc.store(pc, Ordering::SeqCst);
    }
}

impl DspLink for RecordingLink {
    fn inject_interrupt(&self, vector: Vector) {
        self.interrupts.lock().unwrap().push(vector);
    }

    fn instruction_counter(&self) -> u32 {
        self.counter.load(Ordering::SeqCst)
    }

    fn program_counter(&self) -> Word {
        self.pc.load(Ordering::SeqCst)
    }
}
