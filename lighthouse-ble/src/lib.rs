//! BLE client for SteamVR lighthouses
//!
//! Discovers SteamVR base stations ("lighthouses") over Bluetooth LE and
//! switches them on or off through their power management GATT
//! characteristic. Both hardware generations are supported; they advertise
//! under different name prefixes and speak different payloads, see
//! [`Generation`].
//!
//! # Example
//!
//! ```ignore
//! use lighthouse_ble::{
//!     BtleplugTransport, Generation, LighthouseDescriptor, PowerCommand,
//!     DEFAULT_MAX_ATTEMPTS,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = BtleplugTransport::new();
//!
//!     // Find every lighthouse in range
//!     for lighthouse in lighthouse_ble::discover(&transport, None).await? {
//!         println!("{} ({:?})", lighthouse.address, lighthouse.name);
//!     }
//!
//!     // Switch a known lighthouse off
//!     let lighthouse = LighthouseDescriptor::new("AA:BB:CC:DD:EE:FF", Generation::V2)?;
//!     lighthouse_ble::run_command(
//!         &transport,
//!         &lighthouse,
//!         PowerCommand::Off,
//!         DEFAULT_MAX_ATTEMPTS,
//!     )
//!     .await;
//!
//!     Ok(())
//! }
//! ```

mod command;
mod descriptor;
mod discovery;
mod error;
mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use command::{run_command, CommandOutcome, DEFAULT_MAX_ATTEMPTS};
pub use descriptor::{Generation, LighthouseDescriptor, PowerCommand};
pub use discovery::discover;
pub use error::{Error, Result};
pub use transport::{AdvertisedDevice, BtleplugTransport, GattService, Session, Transport};

// Re-export the address type used throughout the public API
pub use btleplug::api::BDAddr;
