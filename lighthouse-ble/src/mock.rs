//! Scripted transport for exercising the command and discovery paths
//! without a radio.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use btleplug::api::BDAddr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::{AdvertisedDevice, GattService, Session, Transport};

/// Every transport call the code under test made, in order of occurrence.
#[derive(Debug, Default)]
pub(crate) struct CallLog {
    pub connects: u32,
    pub reads: u32,
    /// Payload of every write call, whether the script let it succeed or not.
    pub writes: Vec<Vec<u8>>,
    pub disconnects: u32,
}

/// How a session granted by [`MockTransport`] behaves.
#[derive(Debug, Clone)]
pub(crate) struct SessionScript {
    /// Value served by reads; `None` makes reads fail.
    pub state: Option<Vec<u8>>,
    pub write_ok: bool,
    pub disconnect_ok: bool,
    pub services: Vec<GattService>,
}

impl Default for SessionScript {
    fn default() -> Self {
        Self {
            state: Some(Vec::new()),
            write_ok: true,
            disconnect_ok: true,
            services: Vec::new(),
        }
    }
}

/// What one `connect` call does.
#[derive(Debug, Clone)]
pub(crate) enum ConnectScript {
    Refuse,
    Grant(SessionScript),
}

pub(crate) struct MockTransport {
    devices: Vec<AdvertisedDevice>,
    queued: Mutex<VecDeque<ConnectScript>>,
    fallback: ConnectScript,
    log: Arc<Mutex<CallLog>>,
}

impl MockTransport {
    /// Every connect succeeds and behaves per `script` (unless overridden
    /// with [`Self::queued`]).
    pub fn granting(script: SessionScript) -> Self {
        Self::with_fallback(ConnectScript::Grant(script))
    }

    /// Every connect fails.
    pub fn refusing() -> Self {
        Self::with_fallback(ConnectScript::Refuse)
    }

    fn with_fallback(fallback: ConnectScript) -> Self {
        Self {
            devices: Vec::new(),
            queued: Mutex::new(VecDeque::new()),
            fallback,
            log: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    /// Scripts consumed by the first connect calls, before the fallback
    /// applies.
    pub fn queued(self, scripts: Vec<ConnectScript>) -> Self {
        *self.queued.lock().unwrap() = scripts.into();
        self
    }

    /// Devices reported by `scan`, in this order.
    pub fn advertising(mut self, devices: Vec<AdvertisedDevice>) -> Self {
        self.devices = devices;
        self
    }

    pub fn log(&self) -> MutexGuard<'_, CallLog> {
        self.log.lock().unwrap()
    }
}

fn refused() -> Error {
    Error::Ble(btleplug::Error::NotConnected)
}

#[async_trait]
impl Transport for MockTransport {
    async fn scan(&self) -> Result<Vec<AdvertisedDevice>> {
        Ok(self.devices.clone())
    }

    async fn connect(&self, _address: BDAddr) -> Result<Box<dyn Session>> {
        self.log.lock().unwrap().connects += 1;

        let script = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match script {
            ConnectScript::Refuse => Err(refused()),
            ConnectScript::Grant(script) => Ok(Box::new(MockSession {
                script,
                log: Arc::clone(&self.log),
            })),
        }
    }
}

struct MockSession {
    script: SessionScript,
    log: Arc<Mutex<CallLog>>,
}

#[async_trait]
impl Session for MockSession {
    async fn read(&self, _uuid: Uuid) -> Result<Vec<u8>> {
        self.log.lock().unwrap().reads += 1;
        self.script.state.clone().ok_or_else(refused)
    }

    async fn write(&self, _uuid: Uuid, payload: &[u8]) -> Result<()> {
        self.log.lock().unwrap().writes.push(payload.to_vec());
        if self.script.write_ok {
            Ok(())
        } else {
            Err(refused())
        }
    }

    async fn services(&self) -> Result<Vec<GattService>> {
        Ok(self.script.services.clone())
    }

    async fn disconnect(&self) -> Result<()> {
        self.log.lock().unwrap().disconnects += 1;
        if self.script.disconnect_ok {
            Ok(())
        } else {
            Err(refused())
        }
    }
}
