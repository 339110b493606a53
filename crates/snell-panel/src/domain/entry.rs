//! Node entry and the request shapes that create or change one.

use serde::{Deserialize, Serialize};

use super::error::PanelError;

/// Snell protocol version written into subscription lines when the client
/// does not pick one.
pub const DEFAULT_VERSION: u8 = 4;

/// Highest Snell protocol version accepted.
pub const MAX_VERSION: u8 = 5;

/// A stored proxy node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Row id assigned by storage.
    pub id: i64,
    /// Address exactly as entered (IP literal or domain name).
    pub ip: String,
    pub port: u16,
    pub psk: String,
    pub country_code: String,
    pub isp: String,
    pub asn: u32,
    /// Server-generated external reference. Never rewritten after insert.
    pub node_id: String,
    pub node_name: Option<String>,
    pub version: u8,
}

/// Body of `POST /entry`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEntry {
    pub ip: String,
    pub port: u16,
    pub psk: String,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub version: Option<u8>,
}

impl NewEntry {
    /// Trim the free-text fields and drop blank optional ones.
    pub fn normalized(self) -> Self {
        Self {
            ip: self.ip.trim().to_string(),
            port: self.port,
            psk: self.psk.trim().to_string(),
            node_name: non_blank(self.node_name),
            version: self.version,
        }
    }

    pub fn validate(&self) -> Result<(), PanelError> {
        if self.ip.trim().is_empty() {
            return Err(PanelError::InvalidInput("ip is required".into()));
        }
        if self.port == 0 {
            return Err(PanelError::InvalidInput("port must be between 1 and 65535".into()));
        }
        if self.psk.trim().is_empty() {
            return Err(PanelError::InvalidInput("psk is required".into()));
        }
        reject_control_chars("ip", &self.ip)?;
        reject_control_chars("psk", &self.psk)?;
        if let Some(name) = &self.node_name {
            reject_control_chars("node_name", name)?;
        }
        if let Some(version) = self.version {
            validate_version(version)?;
        }
        Ok(())
    }
}

/// Body of `PUT /modify/:node_id`. Every field is optional; empty strings are
/// treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModifyRequest {
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub psk: Option<String>,
    #[serde(default)]
    pub version: Option<u8>,
}

impl ModifyRequest {
    pub fn normalized(self) -> Self {
        Self {
            node_name: non_blank(self.node_name),
            ip: non_blank(self.ip),
            port: self.port,
            psk: non_blank(self.psk),
            version: self.version,
        }
    }

    /// True when no field would be written.
    pub fn is_empty(&self) -> bool {
        self.node_name.is_none()
            && self.ip.is_none()
            && self.port.is_none()
            && self.psk.is_none()
            && self.version.is_none()
    }

    pub fn validate(&self) -> Result<(), PanelError> {
        if self.port == Some(0) {
            return Err(PanelError::InvalidInput("port must be between 1 and 65535".into()));
        }
        for (field, value) in [
            ("node_name", &self.node_name),
            ("ip", &self.ip),
            ("psk", &self.psk),
        ] {
            if let Some(value) = value {
                reject_control_chars(field, value)?;
            }
        }
        if let Some(version) = self.version {
            validate_version(version)?;
        }
        Ok(())
    }
}

/// Column-level change set handed to the store. Built by the service from a
/// [`ModifyRequest`] plus the geo lookup for a new address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub node_name: Option<String>,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub psk: Option<String>,
    pub version: Option<u8>,
    pub geo: Option<GeoInfo>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.node_name.is_none()
            && self.ip.is_none()
            && self.port.is_none()
            && self.psk.is_none()
            && self.version.is_none()
            && self.geo.is_none()
    }
}

/// Geolocation answer for one address, shaped like the ip.sb response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoInfo {
    pub ip: String,
    pub country_code: String,
    pub country: String,
    pub continent_code: String,
    pub isp: String,
    pub organization: String,
    pub asn: u32,
    pub asn_organization: String,
}

fn validate_version(version: u8) -> Result<(), PanelError> {
    if (1..=MAX_VERSION).contains(&version) {
        Ok(())
    } else {
        Err(PanelError::InvalidInput(format!(
            "version must be between 1 and {MAX_VERSION}"
        )))
    }
}

/// Each entry renders as exactly one subscription line, so free-text fields
/// may not carry line breaks or other control characters.
fn reject_control_chars(field: &str, value: &str) -> Result<(), PanelError> {
    if value.chars().any(char::is_control) {
        return Err(PanelError::InvalidInput(format!(
            "{field} must not contain control characters"
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
