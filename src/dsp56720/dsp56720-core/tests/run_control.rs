use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use dsp56720_core::constants::esai;
use dsp56720_core::peripherals::{
    ClockGenerationModule, EnhancedSerialAudioInterface, SerialHostInterface,
};
use dsp56720_core::{
    boot, Debugger, Dsp, DspLink, MemArea, PeripheralBus, Peripherals, QueueShutdown, Step,
    Vector, Word,
};

#[derive(Default)]
struct Link {
    counter: AtomicU32,
    pc: AtomicU32,
    interrupts: Mutex<Vec<Vector>>,
}

impl DspLink for Link {
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

// One-cycle no-op core driving a peripheral bus
struct Core {
    link: Arc<Link>,
    bus: Peripherals,
    program: HashMap<Word, Word>,
    pc: Word,
}

impl Core {
    fn new(bus: Peripherals) -> Self {
        let link = Arc::new(Link::default());
        let mut bus = bus;
        bus.reset(link.clone());
        Self {
            link,
            bus,
            program: HashMap::new(),
            pc: 0,
        }
    }
}

impl Dsp for Core {
    fn program_counter(&self) -> Word {
        self.pc
    }

    fn set_program_counter(&mut self, pc: Word) {
        self.pc = pc;
        self.link.pc.store(pc, Ordering::SeqCst);
    }

    fn exec(&mut self) -> Result<(), QueueShutdown> {
        let pc = self.pc + 1;
        self.set_program_counter(pc);
        self.link.counter.fetch_add(1, Ordering::SeqCst);
        self.bus.exec()
    }

    fn write_memory(&mut self, area: MemArea, address: Word, value: Word) {
        assert_eq!(area, MemArea::P);
        self.program.insert(address, value);
    }
}

#[test]
fn boot_from_host_thread() {
    let shi = SerialHostInterface::new();
    let host = shi.host();
    let loader = shi.host();
    let mut bus = Peripherals::new();
    bus.add(shi);
    let mut core = Core::new(bus);

    let sender = thread::spawn(move || host.write_rx(&[2, 0x1000, 0xAA_AAAA, 0xBB_BBBB]));
    assert_eq!(boot(&loader, &mut core), Ok(0x1000));
    assert_eq!(sender.join().unwrap(), Ok(()));

    assert_eq!(core.pc, 0x1000);
    assert_eq!(core.program[&0x1000], 0xAA_AAAA);
    assert_eq!(core.program[&0x1001], 0xBB_BBBB);
}

#[test]
fn breakpoint_then_counted_continue() {
    let debugger = Arc::new(Debugger::new(false));
    debugger.set_breakpoint(4);

    let runner = {
        let debugger = debugger.clone();
        thread::spawn(move || {
            let mut core = Core::new(Peripherals::new());
            let mut steps = Vec::new();
            loop {
                match debugger.exec(&mut core) {
                    Ok(step) => steps.push(step),
                    Err(QueueShutdown) => return (steps, core.pc),
                }
            }
        })
    };

    debugger.wait_until_stopped();
    debugger.continue_execution(5);
    debugger.wait_until_stopped();
    debugger.shutdown();

    let (steps, pc) = runner.join().unwrap();
    assert_eq!(pc, 9);
    assert_eq!(steps.iter().filter(|step| **step == Step::Breakpoint(4)).count(), 1);
    assert_eq!(steps.iter().filter(|step| **step == Step::Executed).count(), 9);
}

#[test]
fn shutdown_releases_parked_thread() {
    let debugger = Arc::new(Debugger::new(true));
    let runner = {
        let debugger = debugger.clone();
        thread::spawn(move || debugger.exec(&mut Core::new(Peripherals::new())))
    };

    debugger.shutdown();
    assert_eq!(runner.join().unwrap(), Err(QueueShutdown));
}

#[test]
fn audio_paced_by_instruction_count() {
    let cgm = ClockGenerationModule::with_cycles_per_sample(8);
    let audio = EnhancedSerialAudioInterface::new(cgm.sample_clock());
    let streams = audio.streams();

    let mut bus = Peripherals::new();
    bus.add(cgm);
    bus.add(audio);
    let mut core = Core::new(bus);

    core.bus.write(MemArea::X, esai::TCR, 0b1).unwrap();
    core.bus.write(MemArea::X, esai::TX0, 0x77).unwrap();

    let drain = thread::spawn(move || {
        (0..4)
            .map(|_| streams.read_output(0))
            .collect::<Result<Vec<_>, _>>()
    });

    for _ in 0..32 {
        core.exec().unwrap();
    }
    assert_eq!(drain.join().unwrap(), Ok(vec![0x77; 4]));

    // The next transfer after teardown fails instead of blocking
    core.bus.terminate();
    let results: Vec<_> = (0..8).map(|_| core.exec()).collect();
    assert_eq!(results.last(), Some(&Err(QueueShutdown)));
}
