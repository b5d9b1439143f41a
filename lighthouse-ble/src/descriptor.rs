//! Per-generation lighthouse protocol constants.
//!
//! Both lighthouse generations expose a power management characteristic, but
//! under different service UUIDs and with different payload encodings. All of
//! that is static data; this module is pure lookup with no radio traffic.

use std::fmt;
use std::str::FromStr;

use btleplug::api::BDAddr;
use uuid::Uuid;

use crate::error::{Error, Result};

// V1 power management service (0000cb00-0000-1000-8000-00805f9b34fb)
const V1_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000cb00_0000_1000_8000_00805f9b34fb);
const V1_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x0000cb01_0000_1000_8000_00805f9b34fb);

// V2 power management service (00001523-1212-efde-1523-785feabcd124)
const V2_SERVICE_UUID: Uuid = Uuid::from_u128(0x00001523_1212_efde_1523_785feabcd124);
const V2_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x00001525_1212_efde_1523_785feabcd124);

// V1 takes a 20-byte command frame.
const V1_ON: &[u8] = &[
    0x12, 0x00, 0x12, 0x02, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];
const V1_OFF: &[u8] = &[
    0x12, 0x01, 0x00, 0x04, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];

// State frames a V1 reports back when it is already powered down.
const V1_OFF_STATES: &[&[u8]] = &[&[
    0x00, 0x12, 0x00, 0x3c, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
]];

// V2 uses a single power byte.
const V2_ON: &[u8] = &[0x01];
const V2_OFF: &[u8] = &[0x00];
const V2_OFF_STATES: &[&[u8]] = &[&[0x00]];

/// Lighthouse hardware generation.
///
/// Determines the advertised name prefix, the power management GATT
/// service/characteristic, and the payload encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    V1,
    V2,
}

impl Generation {
    /// Classification order during discovery: V1 is tested before V2.
    pub const ALL: [Generation; 2] = [Generation::V1, Generation::V2];

    /// Prefix of the name the lighthouse advertises under.
    pub fn name_prefix(&self) -> &'static str {
        match self {
            Generation::V1 => "HTC BS",
            Generation::V2 => "LHB-",
        }
    }

    /// UUID of the power management GATT service.
    pub fn service(&self) -> Uuid {
        match self {
            Generation::V1 => V1_SERVICE_UUID,
            Generation::V2 => V2_SERVICE_UUID,
        }
    }

    /// UUID of the power management characteristic within [`Self::service`].
    pub fn characteristic(&self) -> Uuid {
        match self {
            Generation::V1 => V1_CHARACTERISTIC_UUID,
            Generation::V2 => V2_CHARACTERISTIC_UUID,
        }
    }

    /// The payload written to the characteristic for `command`.
    pub fn payload_for(&self, command: PowerCommand) -> &'static [u8] {
        match (self, command) {
            (Generation::V1, PowerCommand::On) => V1_ON,
            (Generation::V1, PowerCommand::Off) => V1_OFF,
            (Generation::V2, PowerCommand::On) => V2_ON,
            (Generation::V2, PowerCommand::Off) => V2_OFF,
        }
    }

    /// Whether `observed`, read back from the characteristic, reports the
    /// lighthouse as already powered down.
    pub fn is_off_state(&self, observed: &[u8]) -> bool {
        let states = match self {
            Generation::V1 => V1_OFF_STATES,
            Generation::V2 => V2_OFF_STATES,
        };
        states.iter().any(|state| *state == observed)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::V1 => write!(f, "1.0"),
            Generation::V2 => write!(f, "2.0"),
        }
    }
}

impl FromStr for Generation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1" | "v1" | "V1" => Ok(Generation::V1),
            "2" | "v2" | "V2" => Ok(Generation::V2),
            other => Err(Error::UnknownGeneration {
                value: other.to_string(),
            }),
        }
    }
}

/// The two power states a lighthouse can be told to enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    On,
    Off,
}

impl fmt::Display for PowerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerCommand::On => write!(f, "on"),
            PowerCommand::Off => write!(f, "off"),
        }
    }
}

impl FromStr for PowerCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("on") {
            Ok(PowerCommand::On)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(PowerCommand::Off)
        } else {
            Err(Error::UnknownCommand {
                command: s.to_string(),
            })
        }
    }
}

/// One addressable lighthouse.
#[derive(Debug, Clone)]
pub struct LighthouseDescriptor {
    pub address: BDAddr,
    pub generation: Generation,
    /// Name the device advertised under, when it was seen in a scan.
    pub name: Option<String>,
}

impl LighthouseDescriptor {
    /// Build a descriptor from a textual MAC address.
    ///
    /// The address must be the canonical six-octet colon-separated hex form
    /// (`AA:BB:CC:DD:EE:FF`); anything else fails with
    /// [`Error::InvalidAddress`].
    pub fn new(address: &str, generation: Generation) -> Result<Self> {
        let address = BDAddr::from_str_delim(address).map_err(|_| Error::InvalidAddress {
            address: address.to_string(),
        })?;

        Ok(Self {
            address,
            generation,
            name: None,
        })
    }

    /// Build a descriptor for a device seen in a scan.
    pub fn advertised(address: BDAddr, generation: Generation, name: &str) -> Self {
        Self {
            address,
            generation,
            name: Some(name.to_string()),
        }
    }
}
