//! Lighthouse discovery.
//!
//! One scan, then every reported device is classified by its advertised name
//! prefix and, if it looks like a lighthouse, verified over GATT: the device
//! must expose the generation's power management service and characteristic
//! before it is reported as a find.

use tracing::{debug, info};

use crate::descriptor::{Generation, LighthouseDescriptor};
use crate::error::Result;
use crate::transport::{AdvertisedDevice, Session, Transport};

/// Scan for lighthouses and confirm each candidate over GATT.
///
/// Returns confirmed lighthouses in the order the scan reported them. A
/// `generation` restricts classification to that generation; otherwise V1 is
/// tested before V2. Devices reported more than once by the scan are
/// classified once per report. Verification failures reject the one
/// candidate, never the whole scan.
pub async fn discover(
    transport: &dyn Transport,
    generation: Option<Generation>,
) -> Result<Vec<LighthouseDescriptor>> {
    let devices = transport.scan().await?;
    let mut lighthouses = Vec::new();

    for device in devices {
        let Some(name) = device.name.as_deref() else {
            continue;
        };
        let Some(generation) = classify(name, generation) else {
            continue;
        };

        debug!(
            "{}: potential {generation} lighthouse '{name}'",
            device.address
        );
        match device.rssi {
            Some(rssi) => debug!("{}: signal strength is {rssi}", device.address),
            None => debug!("{}: signal strength is unknown", device.address),
        }

        if !verify(transport, &device, generation).await {
            info!(
                "Unable to communicate with lighthouse '{name}' identified by '{}'.",
                device.address
            );
            continue;
        }

        info!(
            "Found {generation} lighthouse '{name}' identified by '{}'.",
            device.address
        );
        lighthouses.push(LighthouseDescriptor::advertised(
            device.address,
            generation,
            name,
        ));
    }

    Ok(lighthouses)
}

fn classify(name: &str, filter: Option<Generation>) -> Option<Generation> {
    Generation::ALL
        .into_iter()
        .filter(|generation| filter.is_none_or(|wanted| wanted == *generation))
        .find(|generation| name.starts_with(generation.name_prefix()))
}

/// Check that the device exposes the generation's power management service
/// and characteristic. Any failure on the way rejects the candidate.
async fn verify(
    transport: &dyn Transport,
    device: &AdvertisedDevice,
    generation: Generation,
) -> bool {
    let session = match transport.connect(device.address).await {
        Ok(session) => session,
        Err(err) => {
            debug!("{}: connect failed: {err}", device.address);
            return false;
        }
    };

    let result = has_power_characteristic(&*session, device, generation).await;

    if let Err(err) = session.disconnect().await {
        debug!("{}: disconnect failed: {err}", device.address);
    }

    match result {
        Ok(confirmed) => confirmed,
        Err(err) => {
            debug!("{}: service enumeration failed: {err}", device.address);
            false
        }
    }
}

async fn has_power_characteristic(
    session: &dyn Session,
    device: &AdvertisedDevice,
    generation: Generation,
) -> Result<bool> {
    for service in session.services().await? {
        if service.uuid != generation.service() {
            continue;
        }
        debug!("{}: found service '{}'", device.address, service.uuid);

        if service
            .characteristics
            .iter()
            .any(|uuid| *uuid == generation.characteristic())
        {
            debug!(
                "{}: found characteristic '{}'",
                device.address,
                generation.characteristic()
            );
            return Ok(true);
        }
    }

    Ok(false)
}
