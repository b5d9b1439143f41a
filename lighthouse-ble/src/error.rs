use btleplug::api::BDAddr;
use uuid::Uuid;

/// Errors surfaced to callers of this crate.
///
/// Transient radio failures inside the retry and discovery loops are handled
/// in place; only configuration mistakes and setup failures reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MAC address '{address}' is not valid")]
    InvalidAddress { address: String },

    #[error("command '{command}' is not valid")]
    UnknownCommand { command: String },

    #[error("lighthouse generation '{value}' is not valid, expected 1 or 2")]
    UnknownGeneration { value: String },

    #[error("no Bluetooth adapter found")]
    NoAdapter,

    #[error("no device with address '{address}' in range")]
    DeviceNotFound { address: BDAddr },

    #[error("characteristic '{uuid}' not found on device")]
    CharacteristicNotFound { uuid: Uuid },

    #[error(transparent)]
    Ble(#[from] btleplug::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
