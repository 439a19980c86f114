extern crate clap;
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender}; // Inter-thread communication
use ctrlc; // exit using cntrl-c
use env_logger;
use log::{error, info, trace};

use std::fs::File;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

// Internal project modules
use dsp56720_core::peripherals::{
    ChipConfigurationModule, ChipIdentification, ClockGenerationModule,
    EnhancedSerialAudioInterface, EsaiStreams, SerialHostInterface, ShiHost,
};
use dsp56720_core::{boot, Debugger, PeripheralBus, Peripherals, QueueShutdown, Step};
use dsp56720_peripherals::pump::{spawn_drain, spawn_source, PumpEvent};
use dsp56720_peripherals::{ShiReceive, ShiTransmit};

mod config;
mod idle;

use config::Config;
use idle::IdleCore;

// Host-side handles needed to tear the chip down
struct Teardown {
    shi: ShiHost,
    streams: EsaiStreams,
    debugger: Arc<Debugger>,
}

impl Teardown {
    fn shutdown(&self) {
        self.shi.shutdown();
        self.streams.shutdown();
        self.debugger.shutdown();
    }
}

/// Starts a pump thread per configured file
fn start_pumps(
    config: &Config,
    shi: &ShiHost,
    streams: &EsaiStreams,
    events: &Sender<PumpEvent>,
) -> io::Result<Vec<JoinHandle<()>>> {
    let mut pumps = Vec::new();

    let image = File::open(&config.boot)?;
    pumps.push(spawn_source(
        "boot",
        image,
        ShiReceive(shi.clone()),
        events.clone(),
    )?);

    for (channel, path) in &config.inputs {
        if let Some(input) = streams.input(*channel) {
            let name = format!("esai-in{}", channel);
            pumps.push(spawn_source(&name, File::open(path)?, input, events.clone())?);
        }
    }

    for (channel, path) in &config.outputs {
        if let Some(output) = streams.output(*channel) {
            let name = format!("esai-out{}", channel);
            pumps.push(spawn_drain(&name, output, File::create(path)?, events.clone())?);
        }
    }

    if let Some(path) = &config.shi_output {
        pumps.push(spawn_drain(
            "shi-out",
            ShiTransmit(shi.clone()),
            File::create(path)?,
            events.clone(),
        )?);
    }

    Ok(pumps)
}

/// Boots the core from SHI, then runs it under the debugger until shutdown
fn spawn_core(
    bus: Peripherals,
    shi: ShiHost,
    debugger: Arc<Debugger>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("dsp".to_string()).spawn(move || {
        for (area, address, name) in bus.symbols() {
            trace!("Symbol {}:0x{:06x} {}", area.name(), address, name);
        }

        let mut core = IdleCore::new(bus);
        match boot(&shi, &mut core) {
            Ok(pc) => info!("Running from 0x{:06x}", pc),
            Err(QueueShutdown) => info!("Boot aborted"),
        }

        loop {
            match debugger.exec(&mut core) {
                Ok(Step::Executed) => {}
                Ok(Step::Breakpoint(pc)) => info!("Stopped at breakpoint 0x{:06x}", pc),
                Err(QueueShutdown) => break,
            }
        }

        info!("Core stopped after {} instructions", core.instruction_counter());
        core.bus_mut().terminate();
    })
}

/// Logs pump completions until Ctrl-C
fn wait_for_signal(signal: &Receiver<()>, events: &Receiver<PumpEvent>) {
    loop {
        select! {
            recv(signal) -> _ => break,
            recv(events) -> event => match event {
                Ok(PumpEvent::Finished { name, bytes }) => {
                    info!("{} finished ({} bytes)", name, bytes)
                }
                Ok(PumpEvent::Failed { name, error }) => error!("{} failed: {}", name, error),
                Err(_) => break,
            },
        }
    }
}

fn run(config: Config, signal: Receiver<()>) -> io::Result<()> {
    let cgm = ClockGenerationModule::with_cycles_per_sample(config.cycles_per_sample);
    let esai = EnhancedSerialAudioInterface::new(cgm.sample_clock());
    let shi = SerialHostInterface::new();

    let teardown = Teardown {
        shi: shi.host(),
        streams: esai.streams(),
        debugger: Arc::new(Debugger::new(config.stopped)),
    };

    let mut bus = Peripherals::new();
    bus.add(cgm);
    bus.add(ChipConfigurationModule::new());
    bus.add(shi);
    bus.add(esai);
    bus.add(ChipIdentification::new(config.core));

    for &address in &config.breakpoints {
        teardown.debugger.set_breakpoint(address);
    }
    if let (Some(steps), false) = (config.steps, config.stopped) {
        teardown.debugger.continue_execution(steps);
    }

    let (event_sender, event_receiver) = unbounded();
    let pumps = match start_pumps(&config, &teardown.shi, &teardown.streams, &event_sender) {
        Ok(pumps) => pumps,
        Err(e) => {
            teardown.shutdown();
            return Err(e);
        }
    };

    let core = match spawn_core(bus, teardown.shi.clone(), teardown.debugger.clone()) {
        Ok(core) => core,
        Err(e) => {
            teardown.shutdown();
            return Err(e);
        }
    };
    wait_for_signal(&signal, &event_receiver);

    info!("Shutting down");
    teardown.shutdown();
    if core.join().is_err() {
        error!("Core thread panicked");
    }
    for pump in pumps {
        if pump.join().is_err() {
            error!("Pump thread panicked");
        }
    }
    Ok(())
}

/// Main entry point for the DSP56720 peripheral emulator
fn main() {
    env_logger::init();

    // Set up Ctrl-C handler with channel communication
    let (signal_sender, signal_receiver) = bounded(1);
    let handler_result = ctrlc::set_handler(move || {
        if signal_sender.is_full() {
            std::process::exit(-1); // Emergency exit if channel blocked
        }
        let _send_result = signal_sender.send(()); // Send shutdown signal
    });

    if let Err(e) = handler_result {
        error!("Signal handler failed: {:?}", e);
        return;
    }

    // Parse command-line arguments
    let cli_matches = config::app().get_matches();
    let config = match Config::from_matches(&cli_matches) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    if let Err(e) = run(config, signal_receiver) {
        error!("{}", e);
    }
}
