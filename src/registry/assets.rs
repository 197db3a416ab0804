use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error};

use crate::dispatch::sms_email_address;

pub const DEFAULT_PRIORITY: u8 = 5;

/// Contact and routing metadata for one monitored asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    pub priority: u8,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// SMS-gateway address derived from `phone`; empty when no gateway is
    /// configured or synthesis failed.
    #[serde(default)]
    pub sms_email: String,
}

/// Directory of known assets, keyed by exact (case-sensitive) asset id.
#[derive(Debug, Default)]
pub struct AssetDirectory {
    assets: HashMap<String, AssetRecord>,
    sms_gateway: Option<String>,
}

impl AssetDirectory {
    pub fn new(sms_gateway: Option<String>) -> Self {
        Self {
            assets: HashMap::new(),
            sms_gateway,
        }
    }

    /// Rebuild the directory from a persisted snapshot. Stored `sms_email`
    /// values are kept verbatim so a load/save cycle round-trips exactly.
    pub fn from_records(records: Vec<AssetRecord>, sms_gateway: Option<String>) -> Self {
        let mut directory = Self::new(sms_gateway);
        for record in records {
            directory.assets.insert(record.name.clone(), record);
        }
        directory
    }

    /// Full replace, used for asset create/update events. A missing
    /// priority falls back to 5 (lowest).
    pub fn upsert(
        &mut self,
        name: &str,
        priority: Option<u8>,
        contact_name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    ) {
        let mut record = AssetRecord {
            name: name.to_string(),
            priority: priority.unwrap_or(DEFAULT_PRIORITY),
            contact_name: contact_name.unwrap_or_default(),
            email: email.unwrap_or_default(),
            phone: phone.unwrap_or_default(),
            sms_email: String::new(),
        };
        self.synthesize_sms_email(&mut record);
        self.assets.insert(record.name.clone(), record);
    }

    /// Partial update, used for inventory events: only supplied, non-empty
    /// contact fields are written and priority is never touched. Unknown
    /// assets are left alone.
    pub fn partial_update(
        &mut self,
        name: &str,
        contact_name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    ) {
        let gateway = self.sms_gateway.clone();
        let Some(record) = self.assets.get_mut(name) else {
            debug!(asset = name, "inventory update for unknown asset, ignored");
            return;
        };
        if let Some(contact_name) = contact_name.filter(|v| !v.is_empty()) {
            record.contact_name = contact_name;
        }
        if let Some(email) = email.filter(|v| !v.is_empty()) {
            record.email = email;
        }
        if let Some(phone) = phone.filter(|v| !v.is_empty()) {
            record.phone = phone;
            if let Some(gateway) = &gateway {
                match sms_email_address(gateway, &record.phone) {
                    Ok(address) => record.sms_email = address,
                    Err(e) => error!(asset = name, "cannot derive sms address: {e:#}"),
                }
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AssetRecord> {
        self.assets.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&AssetRecord> {
        self.assets.get(name)
    }

    /// Snapshot for persistence, ordered by asset id.
    pub fn snapshot(&self) -> Vec<AssetRecord> {
        let mut records: Vec<AssetRecord> = self.assets.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn synthesize_sms_email(&self, record: &mut AssetRecord) {
        let Some(gateway) = &self.sms_gateway else {
            return;
        };
        if record.phone.is_empty() {
            return;
        }
        match sms_email_address(gateway, &record.phone) {
            Ok(address) => record.sms_email = address,
            Err(e) => error!(asset = %record.name, "cannot derive sms address: {e:#}"),
        }
    }
}
