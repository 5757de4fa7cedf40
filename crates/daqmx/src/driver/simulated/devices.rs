//! Simulated device catalogue and physical-channel resolution.

use serde::{Deserialize, Serialize};

use crate::error::{error_codes, DaqError, Result};
use crate::names::{device_name, unflatten_channel_string};

/// A simulated multifunction device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimDevice {
    /// Device name, the first component of every physical channel.
    pub name: String,
    /// Reported product type.
    #[serde(default = "default_product_type")]
    pub product_type: String,
    /// Number of analog input channels (`aiN`).
    #[serde(default = "default_ai_channels")]
    pub ai_channels: u32,
    /// Number of analog output channels (`aoN`).
    #[serde(default = "default_ao_channels")]
    pub ao_channels: u32,
    /// Line count of each digital port (`portN/lineM`).
    #[serde(default = "default_ports")]
    pub ports: Vec<u32>,
    /// Number of counters (`ctrN`).
    #[serde(default = "default_counters")]
    pub counters: u32,
    /// Number of power channels (`powerN`).
    #[serde(default = "default_power_channels")]
    pub power_channels: u32,
}

fn default_product_type() -> String {
    "Simulated X Series".to_string()
}

fn default_ai_channels() -> u32 {
    8
}

fn default_ao_channels() -> u32 {
    2
}

fn default_ports() -> Vec<u32> {
    vec![32, 8, 8]
}

fn default_counters() -> u32 {
    4
}

fn default_power_channels() -> u32 {
    1
}

impl SimDevice {
    /// Device with the default channel complement.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product_type: default_product_type(),
            ai_channels: default_ai_channels(),
            ao_channels: default_ao_channels(),
            ports: default_ports(),
            counters: default_counters(),
            power_channels: default_power_channels(),
        }
    }

    /// Resolve the device-local part of a physical channel (`ai3`, `port0/line5`).
    ///
    /// A bare port expands to all of its lines.
    pub fn resolve(&self, local: &str) -> Option<Vec<Resource>> {
        let local = local.to_ascii_lowercase();
        if let Some((port, line)) = local.split_once('/') {
            let port = indexed(port, "port")?;
            let line = indexed(line, "line")?;
            let width = *self.ports.get(port as usize)?;
            return (line < width).then(|| vec![Resource::Line { port, line }]);
        }
        if let Some(port) = indexed(&local, "port") {
            let width = *self.ports.get(port as usize)?;
            return Some((0..width).map(|line| Resource::Line { port, line }).collect());
        }
        let single = if let Some(i) = indexed(&local, "ai") {
            (i < self.ai_channels).then_some(Resource::Ai(i))
        } else if let Some(i) = indexed(&local, "ao") {
            (i < self.ao_channels).then_some(Resource::Ao(i))
        } else if let Some(i) = indexed(&local, "ctr") {
            (i < self.counters).then_some(Resource::Ctr(i))
        } else if let Some(i) = indexed(&local, "power") {
            (i < self.power_channels).then_some(Resource::Power(i))
        } else {
            None
        };
        single.map(|r| vec![r])
    }
}

fn indexed(s: &str, prefix: &str) -> Option<u32> {
    s.strip_prefix(prefix)?.parse().ok()
}

/// One hardware resource on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Analog input.
    Ai(u32),
    /// Analog output.
    Ao(u32),
    /// Digital line.
    Line { port: u32, line: u32 },
    /// Counter.
    Ctr(u32),
    /// Power supply channel.
    Power(u32),
}

/// A resolved physical channel token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalChannel {
    /// The token as the caller wrote it.
    pub name: String,
    /// Owning device.
    pub device: String,
    /// Resources; several for a whole port.
    pub resources: Vec<Resource>,
}

/// Resolve a physical channel string against a device list.
///
/// Ranges are expanded first, so `Dev1/ai0:3` yields four entries.
pub fn resolve_physical(devices: &[SimDevice], physical: &str) -> Result<Vec<PhysicalChannel>> {
    let tokens = unflatten_channel_string(physical);
    if tokens.is_empty() {
        return Err(not_found(physical));
    }
    tokens
        .into_iter()
        .map(|token| {
            let trimmed = token.trim_start_matches('/');
            let device = device_name(trimmed);
            let dev = devices
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(device))
                .ok_or_else(|| not_found(&token))?;
            let local = trimmed.get(device.len() + 1..).ok_or_else(|| not_found(&token))?;
            let resources = dev.resolve(local).ok_or_else(|| not_found(&token))?;
            Ok(PhysicalChannel {
                name: token.clone(),
                device: dev.name.clone(),
                resources,
            })
        })
        .collect()
}

fn not_found(physical: &str) -> DaqError {
    DaqError::driver(
        error_codes::PHYSICAL_CHAN_DOES_NOT_EXIST,
        format!("Physical channel specified does not exist on this device.\n\nPhysical Channel Name: {physical}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ranges_and_ports() {
        let devices = vec![SimDevice::new("SimDev1")];
        let chans = resolve_physical(&devices, "SimDev1/ai0:2").unwrap();
        assert_eq!(chans.len(), 3);
        assert_eq!(chans[2].resources, vec![Resource::Ai(2)]);

        let port = resolve_physical(&devices, "SimDev1/port1").unwrap();
        assert_eq!(port[0].resources.len(), 8);
        assert_eq!(port[0].resources[7], Resource::Line { port: 1, line: 7 });
    }

    #[test]
    fn test_unknown_channel() {
        let devices = vec![SimDevice::new("SimDev1")];
        let err = resolve_physical(&devices, "SimDev1/ao9").unwrap_err();
        assert_eq!(err.code(), error_codes::PHYSICAL_CHAN_DOES_NOT_EXIST);
        assert!(resolve_physical(&devices, "Dev7/ai0").is_err());
        assert!(resolve_physical(&devices, "SimDev1/port0/line32").is_err());
    }

    #[test]
    fn test_leading_slash_terminal_form() {
        let devices = vec![SimDevice::new("SimDev1")];
        let chans = resolve_physical(&devices, "/SimDev1/ctr1").unwrap();
        assert_eq!(chans[0].device, "SimDev1");
        assert_eq!(chans[0].resources, vec![Resource::Ctr(1)]);
    }
}
