use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use log::{debug, info};

use crate::dsp::Dsp;
use crate::queue::QueueShutdown;
use crate::utils::Word;

/// Outcome of one [`Debugger::exec`] call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Executed,
    Breakpoint(Word), // Stopped before executing this address
}

struct State {
    breakpoints: BTreeSet<Word>,
    remaining: Option<u64>, // Instructions left before stopping; None runs freely
    stopped: bool,
    resume_from: Option<Word>, // Breakpoint to step off on the next exec
    shutdown: bool,
}

/// Run control wrapped around the core's single-instruction step.
///
/// The execution thread calls [`Debugger::exec`] in a loop; controller threads
/// share the debugger through an `Arc` and steer it with breakpoints,
/// [`Debugger::continue_execution`] and [`Debugger::stop`].
pub struct Debugger {
    state: Mutex<State>,
    changed: Condvar,
}

impl Debugger {
    pub fn new(stopped: bool) -> Self {
        Self {
            state: Mutex::new(State {
                breakpoints: BTreeSet::new(),
                remaining: None,
                stopped,
                resume_from: None,
                shutdown: false,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_breakpoint(&self, address: Word) {
        debug!("Breakpoint set at 0x{:06x}", address);
        self.lock().breakpoints.insert(address);
    }

    pub fn remove_breakpoint(&self, address: Word) {
        debug!("Breakpoint removed at 0x{:06x}", address);
        self.lock().breakpoints.remove(&address);
    }

    /// Breakpoint addresses in ascending order
    pub fn breakpoints(&self) -> Vec<Word> {
        self.lock().breakpoints.iter().copied().collect()
    }

    /// Resumes execution. `0` runs until a breakpoint or [`Debugger::stop`],
    /// any other count runs exactly that many instructions.
    pub fn continue_execution(&self, instructions: u64) {
        let mut state = self.lock();
        state.remaining = if instructions == 0 {
            None
        } else {
            Some(instructions)
        };
        state.stopped = false;
        debug!("Continue for {:?} instructions", state.remaining);
        self.changed.notify_all();
    }

    pub fn stop(&self) {
        let mut state = self.lock();
        state.stopped = true;
        self.changed.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Blocks the caller until execution stops or the debugger shuts down
    pub fn wait_until_stopped(&self) {
        let mut state = self.lock();
        while !state.stopped && !state.shutdown {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Releases the execution thread for good; later `exec` calls fail
    pub fn shutdown(&self) {
        info!("Debugger shutting down");
        self.lock().shutdown = true;
        self.continue_execution(0);
    }

    /// Executes at most one instruction, waiting first while stopped
    pub fn exec<D: Dsp>(&self, dsp: &mut D) -> Result<Step, QueueShutdown> {
        let mut state = self.lock();
        while state.stopped && !state.shutdown {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.shutdown {
            return Err(QueueShutdown);
        }

        let pc = dsp.program_counter();
        let resumed = state.resume_from.take() == Some(pc);
        if !resumed && state.breakpoints.contains(&pc) {
            info!("Breakpoint hit at 0x{:06x}", pc);
            state.stopped = true;
            state.resume_from = Some(pc);
            self.changed.notify_all();
            return Ok(Step::Breakpoint(pc));
        }

        // The core may block on peripheral queues; controllers stay responsive
        drop(state);
        dsp.exec()?;

        let mut state = self.lock();
        if let Some(remaining) = state.remaining {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                debug!("Step count reached at 0x{:06x}", dsp.program_counter());
                state.remaining = None;
                state.stopped = true;
                self.changed.notify_all();
            } else {
                state.remaining = Some(remaining);
            }
        }
        Ok(Step::Executed)
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new(false)
    }
}
