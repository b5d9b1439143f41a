//! BLE transport abstraction and its btleplug implementation.
//!
//! The command and discovery code talk to lighthouses through the
//! [`Transport`]/[`Session`] traits so they can be exercised against scripted
//! transports in tests. [`BtleplugTransport`] is the production
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{BDAddr, Central, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A device seen during a scan.
#[derive(Debug, Clone)]
pub struct AdvertisedDevice {
    pub name: Option<String>,
    pub address: BDAddr,
    pub rssi: Option<i16>,
}

/// A GATT service and the characteristics it exposes.
#[derive(Debug, Clone)]
pub struct GattService {
    pub uuid: Uuid,
    pub characteristics: Vec<Uuid>,
}

/// Scanning for devices and opening connections to them.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Scan for advertising devices, in the order the radio reported them.
    async fn scan(&self) -> Result<Vec<AdvertisedDevice>>;

    /// Open a connection to the device at `address`.
    async fn connect(&self, address: BDAddr) -> Result<Box<dyn Session>>;
}

/// An open connection to one device.
///
/// Callers must call [`Session::disconnect`] on every path once `connect`
/// has succeeded; dropping a session does not release the link.
#[async_trait]
pub trait Session: Send + Sync {
    /// Read the current value of the characteristic with `uuid`.
    async fn read(&self, uuid: Uuid) -> Result<Vec<u8>>;

    /// Write `payload` to the characteristic with `uuid`.
    async fn write(&self, uuid: Uuid, payload: &[u8]) -> Result<()>;

    /// Enumerate the GATT services the device exposes.
    async fn services(&self) -> Result<Vec<GattService>>;

    async fn disconnect(&self) -> Result<()>;
}

/// [`Transport`] backed by the system Bluetooth adapter.
pub struct BtleplugTransport {
    scan_duration: Duration,
}

impl BtleplugTransport {
    pub fn new() -> Self {
        Self::with_scan_duration(Duration::from_secs(5))
    }

    /// How long each scan listens for advertisements before collecting
    /// results.
    pub fn with_scan_duration(scan_duration: Duration) -> Self {
        Self { scan_duration }
    }

    /// Get the default Bluetooth adapter.
    async fn adapter(&self) -> Result<Adapter> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        adapters.into_iter().next().ok_or(Error::NoAdapter)
    }

    async fn find_peripheral(&self, adapter: &Adapter, address: BDAddr) -> Result<Peripheral> {
        // The adapter may already know the device from an earlier scan.
        for peripheral in adapter.peripherals().await? {
            if peripheral.address() == address {
                return Ok(peripheral);
            }
        }

        adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(self.scan_duration).await;
        adapter.stop_scan().await?;

        for peripheral in adapter.peripherals().await? {
            if peripheral.address() == address {
                return Ok(peripheral);
            }
        }

        Err(Error::DeviceNotFound { address })
    }
}

impl Default for BtleplugTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for BtleplugTransport {
    async fn scan(&self) -> Result<Vec<AdvertisedDevice>> {
        let adapter = self.adapter().await?;

        adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(self.scan_duration).await;

        let mut devices = Vec::new();
        for peripheral in adapter.peripherals().await? {
            if let Some(props) = peripheral.properties().await? {
                devices.push(AdvertisedDevice {
                    name: props.local_name,
                    address: peripheral.address(),
                    rssi: props.rssi,
                });
            }
        }

        adapter.stop_scan().await?;
        Ok(devices)
    }

    async fn connect(&self, address: BDAddr) -> Result<Box<dyn Session>> {
        let adapter = self.adapter().await?;
        let peripheral = self.find_peripheral(&adapter, address).await?;

        peripheral.connect().await?;

        // The link is up from here on; release it if service discovery fails.
        if let Err(err) = peripheral.discover_services().await {
            if let Err(disconnect_err) = peripheral.disconnect().await {
                debug!("{address}: disconnect after failed service discovery: {disconnect_err}");
            }
            return Err(err.into());
        }

        Ok(Box::new(BtleplugSession { peripheral }))
    }
}

struct BtleplugSession {
    peripheral: Peripheral,
}

impl BtleplugSession {
    fn characteristic(&self, uuid: Uuid) -> Result<btleplug::api::Characteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(Error::CharacteristicNotFound { uuid })
    }
}

#[async_trait]
impl Session for BtleplugSession {
    async fn read(&self, uuid: Uuid) -> Result<Vec<u8>> {
        let characteristic = self.characteristic(uuid)?;
        Ok(self.peripheral.read(&characteristic).await?)
    }

    async fn write(&self, uuid: Uuid, payload: &[u8]) -> Result<()> {
        let characteristic = self.characteristic(uuid)?;
        self.peripheral
            .write(&characteristic, payload, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    async fn services(&self) -> Result<Vec<GattService>> {
        Ok(self
            .peripheral
            .services()
            .into_iter()
            .map(|service| GattService {
                uuid: service.uuid,
                characteristics: service
                    .characteristics
                    .iter()
                    .map(|characteristic| characteristic.uuid)
                    .collect(),
            })
            .collect())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(self.peripheral.disconnect().await?)
    }
}
