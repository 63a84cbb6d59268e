//! SoundTouch device discovery via mDNS.
//!
//! Devices advertise `_soundtouch._tcp.local`; the first answer carrying an
//! address wins.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use futures_util::{pin_mut, stream::StreamExt};
use tracing::{debug, info, warn};

use crate::errors::ControlPointError;
use crate::soundtouch_client::DEFAULT_PORT;

pub const SERVICE_NAME: &str = "_soundtouch._tcp.local";

/// Interval between repeated mDNS queries while waiting for an answer.
const QUERY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveredDevice {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl DiscoveredDevice {
    /// Builds a device from the records of one mDNS response.
    ///
    /// Returns `None` when no A/AAAA record is present. IPv4 is preferred.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a mdns::RecordKind>) -> Option<Self> {
        let mut instance: Option<String> = None;
        let mut addresses: Vec<IpAddr> = Vec::new();
        let mut port: Option<u16> = None;
        let mut txt: HashMap<String, String> = HashMap::new();

        for kind in records {
            match kind {
                mdns::RecordKind::PTR(name) => {
                    instance.get_or_insert_with(|| name.clone());
                }
                mdns::RecordKind::A(addr) => addresses.push(IpAddr::V4(*addr)),
                mdns::RecordKind::AAAA(addr) => addresses.push(IpAddr::V6(*addr)),
                mdns::RecordKind::SRV { port: p, .. } => {
                    port.get_or_insert(*p);
                }
                mdns::RecordKind::TXT(entries) => {
                    for entry in entries {
                        if let Some((key, value)) = entry.split_once('=') {
                            txt.insert(key.to_string(), value.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        let host = addresses
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addresses.first())?
            .to_string();

        let name = txt
            .get("name")
            .cloned()
            .or_else(|| instance.as_deref().map(instance_label))
            .unwrap_or_else(|| host.clone());

        Some(Self {
            name,
            host,
            port: port.unwrap_or(DEFAULT_PORT),
        })
    }
}

/// `Kitchen._soundtouch._tcp.local` -> `Kitchen`
fn instance_label(instance: &str) -> String {
    instance
        .split(&format!(".{}", SERVICE_NAME))
        .next()
        .unwrap_or(instance)
        .trim()
        .to_string()
}

/// Browses the network for up to `timeout` and returns the first device.
pub fn discover(timeout: Duration) -> Option<DiscoveredDevice> {
    info!(service = SERVICE_NAME, ?timeout, "Searching for SoundTouch devices");
    match async_std::task::block_on(async_std::future::timeout(timeout, first_device())) {
        Ok(Ok(device)) => {
            info!(
                name = device.name.as_str(),
                host = device.host.as_str(),
                port = device.port,
                "SoundTouch device found"
            );
            Some(device)
        }
        Ok(Err(err)) => {
            warn!(error = %err, "Device discovery failed");
            None
        }
        Err(_) => {
            info!("No SoundTouch device answered");
            None
        }
    }
}

async fn first_device() -> Result<DiscoveredDevice, ControlPointError> {
    let stream = mdns::discover::all(SERVICE_NAME, QUERY_INTERVAL)
        .map_err(|e| ControlPointError::Discovery(e.to_string()))?
        .listen();
    pin_mut!(stream);

    while let Some(response) = stream.next().await {
        match response {
            Ok(response) => {
                let kinds = response.records().map(|record| &record.kind);
                match DiscoveredDevice::from_records(kinds) {
                    Some(device) => return Ok(device),
                    None => debug!("mDNS answer without address, waiting for more"),
                }
            }
            Err(err) => warn!(error = %err, "Invalid mDNS response"),
        }
    }

    Err(ControlPointError::Discovery(
        "mDNS stream ended without an answer".to_string(),
    ))
}
