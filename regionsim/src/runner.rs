use std::collections::BTreeMap;

use fieldio::region::PciAddress;
use fieldio::{
    FieldFlags, FieldSpec, OpRegion, buffer_field_read, buffer_field_write, region_field_read,
    region_field_write,
};

use crate::config::{Config, Op, PeripheralConfig, Step};
use crate::machine::Machine;
use crate::peripherals::Peripheral;
use crate::peripherals::ec::EmbeddedController;
use crate::peripherals::generic::Sram;
use crate::peripherals::pci::PciFunction;
use crate::quirk::QuirkTable;
use crate::scope::Scope;

fn build_peripheral(pc: &PeripheralConfig) -> Result<Box<dyn Peripheral>, String> {
    let p: Box<dyn Peripheral> = match pc {
        PeripheralConfig::Sram {
            name,
            space,
            base,
            size,
            init,
        } => {
            let mut sram = Sram::new((*space).into(), *base, *size, name.as_deref());
            sram.preload(0, init)?;
            Box::new(sram)
        }
        PeripheralConfig::Ec { name, base } => Box::new(EmbeddedController::new(*base, name.as_deref())),
        PeripheralConfig::Pci {
            name,
            bus,
            device,
            function,
            vendor_id,
            device_id,
            class,
        } => {
            let address = PciAddress {
                bus: *bus,
                device: *device,
                function: *function,
            };
            Box::new(PciFunction::new(address, *vendor_id, *device_id, *class, name.as_deref()))
        }
    };
    Ok(p)
}

/// Executes configured field accesses against a simulated machine.
pub struct Runner {
    machine: Machine,
    scope: Scope,
    quirks: QuirkTable,
    regions: BTreeMap<String, OpRegion>,
    buffers: BTreeMap<String, Vec<u8>>,
}

impl Runner {
    pub fn new(config: &Config) -> Result<Self, String> {
        let peripherals = config
            .peripherals
            .iter()
            .map(build_peripheral)
            .collect::<Result<Vec<_>, _>>()?;

        let regions = config
            .regions
            .iter()
            .map(|(name, r)| {
                let region = OpRegion {
                    kind: r.space.into(),
                    base: r.base,
                    length: r.length,
                };
                (name.clone(), region)
            })
            .collect();

        Ok(Self {
            machine: Machine::new(peripherals)?,
            scope: Scope::new(config.scope.clone()),
            quirks: QuirkTable::new(&config.quirks),
            regions,
            buffers: config.buffers.clone(),
        })
    }

    fn region_step(&mut self, name: &str, step: &Step) -> Result<u64, String> {
        let region = *self
            .regions
            .get(name)
            .ok_or_else(|| format!("Unknown region {name}"))?;
        let spec = FieldSpec::from_flags(step.offset, step.length, FieldFlags(step.flags))
            .map_err(|e| format!("{name}: {e}"))?;

        let result = match step.op {
            Op::Read => region_field_read(&mut self.machine, &self.scope, &mut self.quirks, &region, &spec),
            Op::Write => {
                let value = write_value(step)?;
                region_field_write(&mut self.machine, &self.scope, &mut self.quirks, &region, &spec, value)
                    .map(|()| value)
            }
        };
        result.map_err(|e| format!("{name}: {e}"))
    }

    fn buffer_step(&mut self, name: &str, step: &Step) -> Result<u64, String> {
        let buffer = self
            .buffers
            .get_mut(name)
            .ok_or_else(|| format!("Unknown buffer {name}"))?;

        let result = match step.op {
            Op::Read => buffer_field_read(buffer, step.offset, step.length),
            Op::Write => {
                let value = write_value(step)?;
                buffer_field_write(buffer, step.offset, step.length, value).map(|()| value)
            }
        };
        result.map_err(|e| format!("{name}: {e}"))
    }

    /// Runs one step and returns the value read or written.
    pub fn step(&mut self, step: &Step) -> Result<u64, String> {
        if step.op == Op::Write && step.expect.is_some() {
            return Err(String::from("expect only applies to reads"));
        }

        let value = match (step.region.as_deref(), step.buffer.as_deref()) {
            (Some(name), None) => self.region_step(name, step)?,
            (None, Some(name)) => self.buffer_step(name, step)?,
            _ => return Err(String::from("Step needs exactly one of region or buffer")),
        };

        match step.expect {
            Some(expected) if expected != value => {
                Err(format!("read 0x{value:x}, expected 0x{expected:x}"))
            }
            _ => Ok(value),
        }
    }

    /// Runs all steps, returning how many failed.
    pub fn run(&mut self, steps: &[Step]) -> usize {
        let mut failures = 0;
        for (i, step) in steps.iter().enumerate() {
            let target = step.region.as_deref().or(step.buffer.as_deref()).unwrap_or("?");
            match self.step(step) {
                Ok(value) => log::info!(
                    "#{i} {:?} {target}[{}:{}] = 0x{value:x}",
                    step.op,
                    step.offset,
                    step.length
                ),
                Err(e) => {
                    log::error!("#{i} {:?} {target}: {e}", step.op);
                    failures += 1;
                }
            }
        }

        for (name, bytes) in &self.buffers {
            log::debug!("buffer {name}: {bytes:02x?}");
        }
        if self.machine.live_maps() != 0 {
            log::warn!("{} mappings still live", self.machine.live_maps());
        }
        failures
    }
}

fn write_value(step: &Step) -> Result<u64, String> {
    step.value.ok_or_else(|| String::from("write step without value"))
}
