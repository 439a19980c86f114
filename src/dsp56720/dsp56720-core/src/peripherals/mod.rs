pub mod ccm;
pub mod cgm;
pub mod chipid;
pub mod esai;
mod memory;
pub mod mods;
pub mod shi;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, trace, warn};

pub use self::ccm::ChipConfigurationModule;
pub use self::cgm::{ClockGenerationModule, SampleClock};
pub use self::chipid::ChipIdentification;
pub use self::esai::{EnhancedSerialAudioInterface, EsaiStreams};
pub use self::memory::IoMemory;
pub use self::mods::{Address, DspHandle, Peripheral, Register};
pub use self::shi::{SerialHostInterface, ShiHost};

use crate::dsp::{DspLink, MemArea, PeripheralBus};
use crate::instruction::Instruction;
use crate::queue::QueueShutdown;
use crate::utils::Word;

/// Every peripheral the bus can host
pub enum Device {
    Cgm(ClockGenerationModule),
    Ccm(ChipConfigurationModule),
    Shi(SerialHostInterface),
    Esai(EnhancedSerialAudioInterface),
    ChipId(ChipIdentification),
}

impl Device {
    fn peripheral(&self) -> &dyn Peripheral {
        match self {
            Device::Cgm(device) => device,
            Device::Ccm(device) => device,
            Device::Shi(device) => device,
            Device::Esai(device) => device,
            Device::ChipId(device) => device,
        }
    }

    fn peripheral_mut(&mut self) -> &mut dyn Peripheral {
        match self {
            Device::Cgm(device) => device,
            Device::Ccm(device) => device,
            Device::Shi(device) => device,
            Device::Esai(device) => device,
            Device::ChipId(device) => device,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Device::Cgm(_) => "CGM",
            Device::Ccm(_) => "CCM",
            Device::Shi(_) => "SHI",
            Device::Esai(_) => "ESAI",
            Device::ChipId(_) => "CHIDR",
        }
    }
}

impl Peripheral for Device {
    fn registers(&self) -> Vec<Register> {
        self.peripheral().registers()
    }

    fn read(&mut self, address: Address, inst: Instruction) -> Result<Word, QueueShutdown> {
        self.peripheral_mut().read(address, inst)
    }

    fn write(&mut self, address: Address, value: Word) -> Result<(), QueueShutdown> {
        self.peripheral_mut().write(address, value)
    }

    fn exec(&mut self) -> Result<(), QueueShutdown> {
        self.peripheral_mut().exec()
    }

    fn connect(&mut self, link: Arc<dyn DspLink>) {
        self.peripheral_mut().connect(link)
    }

    fn reset(&mut self) {
        self.peripheral_mut().reset()
    }

    fn terminate(&mut self) {
        self.peripheral_mut().terminate()
    }
}

impl From<ClockGenerationModule> for Device {
    fn from(device: ClockGenerationModule) -> Self {
        Device::Cgm(device)
    }
}

impl From<ChipConfigurationModule> for Device {
    fn from(device: ChipConfigurationModule) -> Self {
        Device::Ccm(device)
    }
}

impl From<SerialHostInterface> for Device {
    fn from(device: SerialHostInterface) -> Self {
        Device::Shi(device)
    }
}

impl From<EnhancedSerialAudioInterface> for Device {
    fn from(device: EnhancedSerialAudioInterface) -> Self {
        Device::Esai(device)
    }
}

impl From<ChipIdentification> for Device {
    fn from(device: ChipIdentification) -> Self {
        Device::ChipId(device)
    }
}

/// Peripheral address space: register dispatch with flat memory behind it
pub struct Peripherals {
    devices: Vec<Device>,                           // In registration order
    registers: HashMap<Address, (usize, Register)>, // Owning device index per register
    memory: IoMemory,                               // Unclaimed window addresses
    link: Option<Arc<dyn DspLink>>,                 // Bound core, for diagnostics
}

impl Peripherals {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            registers: HashMap::new(),
            memory: IoMemory::new(),
            link: None,
        }
    }

    /// Appends a device and maps its registers. Returns the device index.
    pub fn add(&mut self, device: impl Into<Device>) -> usize {
        let device = device.into();
        let index = self.devices.len();

        for register in device.registers() {
            let previous = self.registers.insert(register.address, (index, register));
            if let Some((owner, previous)) = previous {
                warn!(
                    "Register {} ({}) at {}:0x{:06x} replaces {} ({})",
                    register.name,
                    device.name(),
                    register.address.area.name(),
                    register.address.offset,
                    previous.name,
                    self.devices.get(owner).map_or(device.name(), Device::name)
                );
            }
        }

        self.devices.push(device);
        index
    }

    pub fn device(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    pub fn device_mut(&mut self, index: usize) -> Option<&mut Device> {
        self.devices.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Area, address and name of every mapped register
    pub fn symbols(&self) -> Vec<(MemArea, Word, &'static str)> {
        self.registers
            .values()
            .map(|(_, register)| {
                let address = register.address;
                (address.area, address.offset, register.name)
            })
            .collect()
    }

    fn program_counter(&self) -> Word {
        self.link.as_ref().map_or(0, |link| link.program_counter())
    }
}

impl Default for Peripherals {
    fn default() -> Self {
        Self::new()
    }
}

impl PeripheralBus for Peripherals {
    fn read(
        &mut self,
        area: MemArea,
        address: Word,
        inst: Instruction,
    ) -> Result<Word, QueueShutdown> {
        let target = Address { area, offset: address };
        if let Some(&(index, _)) = self.registers.get(&target) {
            return self.devices[index].read(target, inst);
        }

        match self.memory.read(area, address) {
            Some(value) => {
                trace!(
                    "Peripheral memory read {}:0x{:06x} = 0x{:06x}",
                    area.name(),
                    address,
                    value
                );
                Ok(value)
            }
            None => {
                debug!(
                    "Out of bounds peripheral read {}:0x{:06x} at pc 0x{:06x}",
                    area.name(),
                    address,
                    self.program_counter()
                );
                Ok(0)
            }
        }
    }

    fn write(&mut self, area: MemArea, address: Word, value: Word) -> Result<(), QueueShutdown> {
        let target = Address { area, offset: address };
        if let Some(&(index, _)) = self.registers.get(&target) {
            return self.devices[index].write(target, value);
        }

        if self.memory.write(area, address, value) {
            trace!(
                "Peripheral memory write {}:0x{:06x} = 0x{:06x}",
                area.name(),
                address,
                value
            );
        } else {
            debug!(
                "Out of bounds peripheral write {}:0x{:06x} = 0x{:06x} at pc 0x{:06x}",
                area.name(),
                address,
                value,
                self.program_counter()
            );
        }
        Ok(())
    }

    fn exec(&mut self) -> Result<(), QueueShutdown> {
        for device in self.devices.iter_mut() {
            device.exec()?;
        }
        Ok(())
    }

    fn reset(&mut self, link: Arc<dyn DspLink>) {
        info!("Resetting {} peripherals", self.devices.len());
        for device in self.devices.iter_mut() {
            device.connect(link.clone());
            device.reset();
        }
        self.link = Some(link);
    }

    fn terminate(&mut self) {
        for device in self.devices.iter_mut() {
            device.terminate();
        }
    }
}

#[cfg(test)]
mod peripherals_tests {
    use super::*;
    use crate::constants::address_space::{IO_FIRST, IO_LAST};
    use crate::constants::{ccm, chipid, esai, shi, vectors};
    use crate::testing::RecordingLink;

    fn chip() -> (Peripherals, Arc<RecordingLink>) {
        let cgm = ClockGenerationModule::with_cycles_per_sample(4);
        let esai = EnhancedSerialAudioInterface::new(cgm.sample_clock());

        let mut bus = Peripherals::new();
        bus.add(cgm);
        bus.add(ChipConfigurationModule::new());
        bus.add(SerialHostInterface::new());
        bus.add(esai);
        bus.add(ChipIdentification::new(0));

        let link = Arc::new(RecordingLink::default());
        bus.reset(link.clone());
        (bus, link)
    }

    #[test]
    fn test_registers_dispatch_to_owner() {
        let (mut bus, _link) = chip();
        assert_eq!(bus.read(MemArea::X, chipid::CHIDR, Instruction::Other), Ok(0x720));

        bus.write(MemArea::Y, ccm::EMBC, 0x55).unwrap();
        assert_eq!(bus.read(MemArea::Y, ccm::EMBC, Instruction::Other), Ok(0x55));

        // Same offset in the other area is plain memory
        assert_eq!(bus.read(MemArea::X, ccm::EMBC, Instruction::Other), Ok(0));
    }

    #[test]
    fn test_later_registration_wins() {
        let mut bus = Peripherals::new();
        bus.add(ChipIdentification::new(0));
        let index = bus.add(ChipIdentification::new(1));
        assert_eq!(index, 1);
        assert_eq!(bus.len(), 2);
        assert_eq!(bus.symbols().len(), 1);
        assert_eq!(bus.read(MemArea::X, chipid::CHIDR, Instruction::Other), Ok(0x01_0720));
    }

    #[test]
    fn test_unmapped_window_is_memory() {
        let (mut bus, _link) = chip();
        bus.write(MemArea::X, IO_FIRST, 0x12_3456).unwrap();
        bus.write(MemArea::Y, IO_FIRST, 0x65_4321).unwrap();
        bus.write(MemArea::Y, IO_LAST, 7).unwrap();
        assert_eq!(bus.read(MemArea::X, IO_FIRST, Instruction::Other), Ok(0x12_3456));
        assert_eq!(bus.read(MemArea::Y, IO_FIRST, Instruction::Other), Ok(0x65_4321));
        assert_eq!(bus.read(MemArea::Y, IO_LAST, Instruction::Other), Ok(7));
    }

    #[test]
    fn test_out_of_bounds_is_absorbed() {
        let (mut bus, link) = chip();
        link.set_pc(0x40);
        assert_eq!(bus.write(MemArea::X, 0x10, 9), Ok(()));
        assert_eq!(bus.read(MemArea::X, 0x10, Instruction::Other), Ok(0));
        assert_eq!(bus.write(MemArea::P, IO_FIRST, 9), Ok(()));
        assert_eq!(bus.read(MemArea::P, IO_FIRST, Instruction::Other), Ok(0));
    }

    #[test]
    fn test_symbols_cover_every_register() {
        let (bus, _link) = chip();
        let symbols = bus.symbols();
        // PCTL, EMBC, ODBC, five SHI, sixteen ESAI, CHIDR
        assert_eq!(symbols.len(), 1 + 2 + 5 + 16 + 1);
        assert!(symbols.contains(&(MemArea::X, shi::HCSR, "HCSR")));
        assert!(symbols.contains(&(MemArea::Y, ccm::ODBC, "ODBC")));
        assert!(symbols.contains(&(MemArea::X, esai::TX0 + 5, "TX5")));
    }

    #[test]
    fn test_exec_reaches_every_device() {
        let (mut bus, link) = chip();
        bus.write(MemArea::X, esai::TCR, 0b1 | 1 << 22).unwrap();
        bus.write(MemArea::X, shi::HCSR, 0b1 | 1 << 11).unwrap();
        bus.write(MemArea::X, shi::HTX, 0x42).unwrap();

        link.advance(4);
        bus.exec().unwrap();
        assert_eq!(
            link.interrupts(),
            vec![vectors::SHI_TRANSMIT_DATA, vectors::ESAI_TRANSMIT_DATA]
        );
    }

    #[test]
    fn test_exec_stops_after_shutdown() {
        let (mut bus, link) = chip();
        bus.write(MemArea::X, esai::TCR, 0b1).unwrap();
        bus.terminate();
        bus.terminate();

        link.advance(4);
        assert_eq!(bus.exec(), Err(QueueShutdown));
        assert_eq!(bus.write(MemArea::X, shi::HTX, 1), Err(QueueShutdown));
    }
}
