use std::collections::BTreeMap;

use fieldio::RegionKind;
use serde::Deserialize;

/// Region space names as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Space {
    SystemMemory,
    SystemIo,
    PciConfig,
    EmbeddedControl,
    SmBus,
    Cmos,
    PciBarTarget,
}

impl From<Space> for RegionKind {
    fn from(s: Space) -> Self {
        match s {
            Space::SystemMemory => RegionKind::SystemMemory,
            Space::SystemIo => RegionKind::SystemIo,
            Space::PciConfig => RegionKind::PciConfig,
            Space::EmbeddedControl => RegionKind::EmbeddedControl,
            Space::SmBus => RegionKind::SmBus,
            Space::Cmos => RegionKind::Cmos,
            Space::PciBarTarget => RegionKind::PciBarTarget,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PeripheralConfig {
    Sram {
        name: Option<String>,
        space: Space,
        base: u64,
        size: u64,
        #[serde(default)]
        init: Vec<u8>,
    },
    Ec {
        name: Option<String>,
        #[serde(default)]
        base: u64,
    },
    Pci {
        name: Option<String>,
        #[serde(default)]
        bus: u8,
        device: u16,
        #[serde(default)]
        function: u16,
        vendor_id: u16,
        device_id: u16,
        #[serde(default)]
        class: u32,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RegionConfig {
    pub space: Space,
    pub base: u64,
    pub length: u64,
}

/// Namespace property value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Property {
    Integer(u64),
    String(String),
    Buffer(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuirkAction {
    /// Inverts the field bits in both directions.
    Invert,
    /// Adds `amount` on read and subtracts it on write.
    Offset,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuirkConfig {
    pub space: Space,
    pub address: u64,
    pub action: QuirkAction,
    #[serde(default)]
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Read,
    Write,
}

/// One field access. Exactly one of `region` or `buffer` names the target.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub op: Op,
    pub region: Option<String>,
    pub buffer: Option<String>,
    pub offset: u32,
    pub length: u32,
    /// Raw field flags byte (access type, lock and update rule).
    #[serde(default)]
    pub flags: u8,
    pub value: Option<u64>,
    pub expect: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default, rename = "peripheral")]
    pub peripherals: Vec<PeripheralConfig>,
    #[serde(default, rename = "region")]
    pub regions: BTreeMap<String, RegionConfig>,
    #[serde(default, rename = "buffer")]
    pub buffers: BTreeMap<String, Vec<u8>>,
    #[serde(default)]
    pub scope: BTreeMap<String, Property>,
    #[serde(default, rename = "quirk")]
    pub quirks: Vec<QuirkConfig>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Config {
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("Invalid config ({e})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[peripheral]]
        type = "sram"
        space = "SystemIo"
        base = 0x80
        size = 16
        init = [1, 2]

        [[peripheral]]
        type = "pci"
        device = 3
        vendor_id = 0x8086
        device_id = 0x1234

        [region.IO0]
        space = "SystemIo"
        base = 0x80
        length = 16

        [buffer]
        B0 = [0, 0, 0]

        [scope]
        _ADR = 0x00030000
        _HID = "PNP0C09"

        [[quirk]]
        space = "EmbeddedControl"
        address = 0x10
        action = "offset"
        amount = 5

        [[step]]
        op = "write"
        region = "IO0"
        offset = 4
        length = 12
        flags = 0x02
        value = 0xabc
    "#;

    #[test]
    fn parses_sample() {
        let c = Config::parse(SAMPLE).unwrap();
        assert_eq!(c.peripherals.len(), 2);
        assert!(matches!(
            c.peripherals[0],
            PeripheralConfig::Sram { space: Space::SystemIo, base: 0x80, .. }
        ));
        assert!(matches!(
            c.peripherals[1],
            PeripheralConfig::Pci { bus: 0, device: 3, function: 0, .. }
        ));
        assert_eq!(c.regions["IO0"].length, 16);
        assert_eq!(c.buffers["B0"], vec![0, 0, 0]);
        assert_eq!(c.scope["_ADR"], Property::Integer(0x30000));
        assert_eq!(c.scope["_HID"], Property::String(String::from("PNP0C09")));
        assert_eq!(c.quirks[0].action, QuirkAction::Offset);
        assert_eq!(c.steps[0].op, Op::Write);
        assert_eq!(c.steps[0].value, Some(0xabc));
        assert_eq!(c.steps[0].expect, None);
    }

    #[test]
    fn unknown_space_rejected() {
        let r = Config::parse(
            r#"
            [region.X]
            space = "Nowhere"
            base = 0
            length = 1
            "#,
        );
        assert!(r.is_err());
    }
}
