use crate::api::atera::types::RawDevice;
use crate::devices::status;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";

const NAME_FIELDS: [&str; 4] = ["MachineName", "AgentName", "ComputerName", "Name"];
const ID_FIELDS: [&str; 4] = ["AgentID", "AgentId", "ID", "DeviceGuid"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceId {
    Numeric(i64),
    Text(String),
    Unknown,
}

impl DeviceId {
    /// The numeric agent id the delete endpoint expects, if this is one.
    pub fn agent_id(&self) -> Option<i64> {
        match self {
            Self::Numeric(id) if *id > 0 => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Hardware and BIOS details. `None` means the agent did not report the field;
/// the UI decides what placeholder to show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedInfo {
    pub cpu: Option<String>,
    pub processor_cores: Option<i64>,
    pub bios_info: Option<String>,
    pub bios_date: Option<String>,
    pub vendor_model: Option<String>,
    pub vendor_serial: Option<String>,
    pub motherboard: Option<String>,
    pub domain_name: Option<String>,
    pub mac_addresses: Option<String>,
    pub windows_serial: Option<String>,
    pub reported_from_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDevice {
    pub id: DeviceId,
    pub name: String,
    pub folder: Option<String>,
    pub online: bool,
    pub last_seen_raw: Option<String>,
    pub last_seen_display: String,
    pub days_offline: Option<i64>,
    pub is_long_offline: bool,

    pub os: Option<String>,
    pub os_description: Option<String>,
    pub os_build: Option<String>,
    pub ip_address: Option<String>,
    pub current_logged_users: Option<String>,
    pub last_login_user: Option<String>,
    pub logged_user: Option<String>,
    pub memory: Option<String>,
    pub last_reboot: Option<String>,
    pub agent_version: Option<String>,
    pub app_view_url: Option<String>,

    pub extended: ExtendedInfo,
}

impl NormalizedDevice {
    /// Deletion is only offered for devices gone longer than the threshold.
    pub fn can_offer_delete(&self) -> bool {
        self.is_long_offline
    }
}

pub fn resolve_name(raw: &RawDevice) -> String {
    NAME_FIELDS
        .iter()
        .find_map(|key| raw.text(key))
        .unwrap_or(UNKNOWN_DEVICE_NAME)
        .to_string()
}

pub fn resolve_folder(raw: &RawDevice) -> Option<String> {
    raw.text("FolderName")
        .or_else(|| raw.text("CustomerName"))
        .map(str::to_string)
        .or_else(|| {
            raw.integer("CustomerID")
                .filter(|id| *id != 0)
                .map(|id| format!("Customer {id}"))
        })
}

pub fn resolve_id(raw: &RawDevice) -> DeviceId {
    ID_FIELDS
        .iter()
        .find_map(|key| match raw.field(key)? {
            Value::Number(n) => match n.as_i64() {
                Some(0) => None,
                Some(id) => Some(DeviceId::Numeric(id)),
                None => Some(DeviceId::Text(n.to_string())),
            },
            Value::String(s) if !s.trim().is_empty() => Some(DeviceId::Text(s.trim().to_string())),
            _ => None,
        })
        .unwrap_or(DeviceId::Unknown)
}

fn resolve_os(raw: &RawDevice) -> Option<String> {
    match (raw.text("OS"), raw.text("OSVersion"), raw.text("OSNum")) {
        (Some(os), Some(version), _) => Some(format!("{os} {version}")),
        (Some(os), None, _) => Some(os.to_string()),
        (None, _, Some(num)) => Some(format!("Windows {num}")),
        (None, _, None) => None,
    }
}

fn resolve_logged_user(raw: &RawDevice) -> Option<String> {
    let user = raw
        .text("CurrentLoggedUsers")
        .or_else(|| raw.text("LastLoginUser"))?;
    // Atera appends "(Since: <date>)" to the session owner.
    let cleaned = match user.split_once("(Since:") {
        Some((name, _)) => name.trim(),
        None => user,
    };
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn resolve_memory(raw: &RawDevice) -> Option<String> {
    raw.number("Memory")
        .filter(|mb| *mb > 0.0)
        .map(|mb| format!("{} GB", (mb / 1024.0).round()))
}

fn resolve_cpu(raw: &RawDevice) -> Option<String> {
    let base = raw.text("Processor").map(str::to_string).or_else(|| {
        let vendor = raw.text("Vendor");
        let model = raw.text("VendorBrandModel");
        if vendor.is_none() && model.is_none() {
            return None;
        }
        Some(format!(
            "{} {}",
            vendor.unwrap_or("Unknown"),
            model.unwrap_or("Computer")
        ))
    });
    let base = base.filter(|cpu| cpu != "Unknown Computer" && cpu != "Unknown Unknown")?;

    match raw.text("ProcessorClock") {
        Some(clock) if clock != "Unknown" => Some(format!("{base} @ {clock}")),
        _ => Some(base),
    }
}

fn resolve_extended(raw: &RawDevice) -> ExtendedInfo {
    let bios_info = match (raw.text("BiosManufacturer"), raw.text("BiosVersion")) {
        (Some(manufacturer), Some(version)) => Some(format!("{manufacturer} {version}")),
        _ => None,
    };
    let macs = raw.text_list("MacAddresses");

    ExtendedInfo {
        cpu: resolve_cpu(raw),
        processor_cores: raw.integer("ProcessorCoresCount").filter(|c| *c > 0),
        bios_info,
        bios_date: raw.text("BiosReleaseDate").map(str::to_string),
        vendor_model: raw.text("VendorBrandModel").map(str::to_string),
        vendor_serial: raw.text("VendorSerialNumber").map(str::to_string),
        motherboard: raw.text("Motherboard").map(str::to_string),
        domain_name: raw.text("DomainName").map(str::to_string),
        mac_addresses: (!macs.is_empty()).then(|| macs.join(", ")),
        windows_serial: raw.text("WindowsSerialNumber").map(str::to_string),
        reported_from_ip: raw.text("ReportedFromIP").map(str::to_string),
    }
}

/// Builds the canonical view of one agent. Never fails: every missing or
/// mistyped field falls back to its default.
pub fn normalize(raw: &RawDevice, now: DateTime<Utc>) -> NormalizedDevice {
    let last_seen_raw = raw.text("LastSeen").map(str::to_string);
    let status = status::classify(raw.field("Online"), last_seen_raw.as_deref(), now);
    let text = |key: &str| raw.text(key).map(str::to_string);

    NormalizedDevice {
        id: resolve_id(raw),
        name: resolve_name(raw),
        folder: resolve_folder(raw),
        online: status.is_online,
        last_seen_raw,
        last_seen_display: status.last_seen_display,
        days_offline: status.days_offline,
        is_long_offline: status.is_long_offline,

        os: text("OS"),
        os_description: resolve_os(raw),
        os_build: text("OSBuild"),
        ip_address: raw.text_list("IpAddresses").first().map(|ip| ip.to_string()),
        current_logged_users: text("CurrentLoggedUsers"),
        last_login_user: text("LastLoginUser"),
        logged_user: resolve_logged_user(raw),
        memory: resolve_memory(raw),
        last_reboot: text("LastRebootTime"),
        agent_version: text("AgentVersion"),
        app_view_url: text("AppViewUrl"),

        extended: resolve_extended(raw),
    }
}

pub fn normalize_all(raw: &[RawDevice], now: DateTime<Utc>) -> Vec<NormalizedDevice> {
    let devices: Vec<_> = raw.iter().map(|r| normalize(r, now)).collect();

    let mut seen = HashSet::new();
    for device in &devices {
        if device.id != DeviceId::Unknown && !seen.insert(&device.id) {
            warn!(id = %device.id, name = %device.name, "duplicate device id in fetched collection");
        }
    }

    devices
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    pub(crate) fn device(value: Value) -> NormalizedDevice {
        normalize(&RawDevice::from(value), now())
    }

    #[test]
    fn name_priority_and_fallback() {
        assert_eq!(
            resolve_name(&RawDevice::from(json!({
                "Name": "generic",
                "ComputerName": "computer",
                "AgentName": "agent",
                "MachineName": "machine"
            }))),
            "machine"
        );
        assert_eq!(
            resolve_name(&RawDevice::from(json!({
                "MachineName": "",
                "AgentName": "  ",
                "ComputerName": "computer"
            }))),
            "computer"
        );
        assert_eq!(resolve_name(&RawDevice::from(json!({}))), UNKNOWN_DEVICE_NAME);
    }

    #[test]
    fn folder_priority_and_whitespace() {
        let folder = |v| resolve_folder(&RawDevice::from(v));
        assert_eq!(
            folder(json!({ "FolderName": " Lab ", "CustomerName": "Acme" })).as_deref(),
            Some("Lab")
        );
        assert_eq!(
            folder(json!({ "FolderName": "   ", "CustomerName": "Acme" })).as_deref(),
            Some("Acme")
        );
        assert_eq!(
            folder(json!({ "CustomerID": 42 })).as_deref(),
            Some("Customer 42")
        );
        assert_eq!(folder(json!({ "CustomerID": 0 })), None);
        assert_eq!(folder(json!({})), None);
    }

    #[test]
    fn id_priority() {
        let id = |v| resolve_id(&RawDevice::from(v));
        assert_eq!(
            id(json!({ "AgentID": 5, "AgentId": 6, "ID": 7, "DeviceGuid": "g" })),
            DeviceId::Numeric(5)
        );
        assert_eq!(id(json!({ "AgentId": 6, "ID": 7 })), DeviceId::Numeric(6));
        assert_eq!(id(json!({ "AgentID": 0, "ID": "abc" })), DeviceId::Text("abc".into()));
        assert_eq!(
            id(json!({ "DeviceGuid": "3f2a-11" })),
            DeviceId::Text("3f2a-11".into())
        );
        assert_eq!(id(json!({})), DeviceId::Unknown);
        assert_eq!(DeviceId::Unknown.to_string(), "unknown");
    }

    #[test]
    fn only_positive_numeric_ids_are_agent_ids() {
        assert_eq!(DeviceId::Numeric(12).agent_id(), Some(12));
        assert_eq!(DeviceId::Numeric(-3).agent_id(), None);
        assert_eq!(DeviceId::Text("12".into()).agent_id(), None);
        assert_eq!(DeviceId::Unknown.agent_id(), None);
    }

    #[test]
    fn empty_record_normalizes_to_defaults() {
        let d = device(json!({}));
        assert_eq!(d.id, DeviceId::Unknown);
        assert_eq!(d.name, UNKNOWN_DEVICE_NAME);
        assert_eq!(d.folder, None);
        assert!(!d.online);
        assert_eq!(d.last_seen_display, "Unknown");
        assert_eq!(d.days_offline, None);
        assert!(!d.is_long_offline);
        assert_eq!(d.extended, ExtendedInfo::default());
    }

    #[test]
    fn mistyped_fields_do_not_poison_the_record() {
        let d = device(json!({
            "AgentID": 9,
            "MachineName": ["not", "a", "string"],
            "ComputerName": "fallback",
            "Online": { "weird": true },
            "IpAddresses": 17,
            "LastSeen": 12345,
            "Memory": "lots"
        }));

        assert_eq!(d.id, DeviceId::Numeric(9));
        assert_eq!(d.name, "fallback");
        assert!(!d.online);
        assert_eq!(d.ip_address, None);
        assert_eq!(d.days_offline, None);
        assert_eq!(d.memory, None);
    }

    #[test]
    fn long_offline_device_is_deletable() {
        let seen = (now() - Duration::days(45)).to_rfc3339();
        let d = device(json!({ "AgentID": 3, "Online": false, "LastSeen": seen }));

        assert!(!d.online);
        assert_eq!(d.days_offline, Some(45));
        assert!(d.is_long_offline);
        assert!(d.can_offer_delete());
    }

    #[test]
    fn recently_seen_device_is_not_deletable() {
        let seen = (now() - Duration::days(2)).to_rfc3339();
        let d = device(json!({ "AgentID": 3, "Online": "false", "LastSeen": seen }));
        assert!(!d.can_offer_delete());
    }

    #[test]
    fn summary_fields() {
        let d = device(json!({
            "OS": "Windows 11 Pro",
            "OSVersion": "23H2",
            "OSBuild": "22631",
            "IpAddresses": ["192.168.1.5", "10.0.0.2"],
            "CurrentLoggedUsers": "ACME\\jdoe (Since: 10/01/2026)",
            "LastLoginUser": "admin",
            "Memory": 16384,
            "AgentVersion": "2.1.0",
            "AppViewUrl": "https://app.atera.com/new/agent/3"
        }));

        assert_eq!(d.os.as_deref(), Some("Windows 11 Pro"));
        assert_eq!(d.os_description.as_deref(), Some("Windows 11 Pro 23H2"));
        assert_eq!(d.os_build.as_deref(), Some("22631"));
        assert_eq!(d.ip_address.as_deref(), Some("192.168.1.5"));
        assert_eq!(d.logged_user.as_deref(), Some("ACME\\jdoe"));
        assert_eq!(d.last_login_user.as_deref(), Some("admin"));
        assert_eq!(d.memory.as_deref(), Some("16 GB"));
        assert_eq!(d.agent_version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn os_falls_back_to_os_number() {
        let d = device(json!({ "OSNum": "10" }));
        assert_eq!(d.os, None);
        assert_eq!(d.os_description.as_deref(), Some("Windows 10"));
    }

    #[test]
    fn logged_user_falls_back_to_last_login() {
        let d = device(json!({ "LastLoginUser": "svc-backup" }));
        assert_eq!(d.logged_user.as_deref(), Some("svc-backup"));
    }

    #[test]
    fn cpu_combinations() {
        let cpu = |v| resolve_cpu(&RawDevice::from(v));
        assert_eq!(
            cpu(json!({ "Processor": "Intel Core i7-1165G7", "ProcessorClock": "2.80GHz" })).as_deref(),
            Some("Intel Core i7-1165G7 @ 2.80GHz")
        );
        assert_eq!(
            cpu(json!({ "Processor": "AMD Ryzen 5", "ProcessorClock": "Unknown" })).as_deref(),
            Some("AMD Ryzen 5")
        );
        assert_eq!(
            cpu(json!({ "Vendor": "Dell", "VendorBrandModel": "OptiPlex 7090" })).as_deref(),
            Some("Dell OptiPlex 7090")
        );
        assert_eq!(cpu(json!({ "Vendor": "Unknown" })), None);
        assert_eq!(cpu(json!({ "ProcessorClock": "3.1GHz" })), None);
    }

    #[test]
    fn extended_info_combines_bios_fields() {
        let d = device(json!({
            "BiosManufacturer": "Dell Inc.",
            "BiosVersion": "1.2.3",
            "BiosReleaseDate": "2023-06-01T12:00:00Z",
            "MacAddresses": ["AA:BB", "CC:DD"],
            "ProcessorCoresCount": 8,
            "DomainName": "corp.local"
        }));

        assert_eq!(d.extended.bios_info.as_deref(), Some("Dell Inc. 1.2.3"));
        assert_eq!(d.extended.bios_date.as_deref(), Some("2023-06-01T12:00:00Z"));
        assert_eq!(d.extended.mac_addresses.as_deref(), Some("AA:BB, CC:DD"));
        assert_eq!(d.extended.processor_cores, Some(8));
        assert_eq!(d.extended.domain_name.as_deref(), Some("corp.local"));

        let partial = device(json!({ "BiosManufacturer": "Dell Inc." }));
        assert_eq!(partial.extended.bios_info, None);
    }
}
