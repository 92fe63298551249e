//! Broker login credentials for the two logical control channels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which logical channel a credential record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelKind {
    /// Status notifications are read from this channel's topics.
    Hardware,
    /// Broker login and control publishing use this channel.
    Software,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware => f.write_str("HARDWARE"),
            Self::Software => f.write_str("SOFTWARE"),
        }
    }
}

/// Broker identity for one channel.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCredentials {
    #[serde(alias = "deviceType")]
    pub kind: ChannelKind,
    #[serde(alias = "deviceName")]
    pub device_name: String,
    #[serde(alias = "productKey")]
    pub product_key: String,
    #[serde(alias = "devicePwd")]
    pub device_secret: String,
}

impl fmt::Debug for ControlCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlCredentials")
            .field("kind", &self.kind)
            .field("device_name", &self.device_name)
            .field("product_key", &self.product_key)
            .field("device_secret", &"***")
            .finish()
    }
}

impl ControlCredentials {
    /// Topic prefix shared by every topic of this channel.
    #[must_use]
    pub fn topic_prefix(&self) -> String {
        format!("/{}/{}", self.product_key, self.device_name)
    }
}

/// The two channels, resolved once from the fetched credential list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlChannels {
    pub hardware: ControlCredentials,
    pub software: ControlCredentials,
}

impl ControlChannels {
    /// Pick the hardware and software records out of `records`.
    ///
    /// When a kind appears more than once the last record wins.
    ///
    /// # Errors
    ///
    /// Returns the missing [`ChannelKind`] when either record is absent.
    pub fn from_records(
        records: impl IntoIterator<Item = ControlCredentials>,
    ) -> Result<Self, ChannelKind> {
        let mut hardware = None;
        let mut software = None;
        for record in records {
            match record.kind {
                ChannelKind::Hardware => hardware = Some(record),
                ChannelKind::Software => software = Some(record),
            }
        }
        Ok(Self {
            hardware: hardware.ok_or(ChannelKind::Hardware)?,
            software: software.ok_or(ChannelKind::Software)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ChannelKind, name: &str) -> ControlCredentials {
        ControlCredentials {
            kind,
            device_name: name.to_string(),
            product_key: "pk".to_string(),
            device_secret: "secret".to_string(),
        }
    }

    #[test]
    fn should_resolve_both_channels() {
        let channels = ControlChannels::from_records([
            record(ChannelKind::Software, "sw"),
            record(ChannelKind::Hardware, "hw"),
        ])
        .unwrap();
        assert_eq!(channels.hardware.device_name, "hw");
        assert_eq!(channels.software.device_name, "sw");
    }

    #[test]
    fn should_report_missing_software_channel() {
        let result = ControlChannels::from_records([record(ChannelKind::Hardware, "hw")]);
        assert_eq!(result.unwrap_err(), ChannelKind::Software);
    }

    #[test]
    fn should_report_missing_hardware_channel() {
        let result = ControlChannels::from_records(Vec::new());
        assert_eq!(result.unwrap_err(), ChannelKind::Hardware);
    }

    #[test]
    fn should_deserialize_vendor_record() {
        let json = r#"{
            "deviceName": "2c9459fd",
            "devicePwd": "s3cr3t",
            "productKey": "TLdnl8aKqCL",
            "deviceType": "SOFTWARE",
            "macAddress": "",
            "loadDeviceUrl": ""
        }"#;
        let record: ControlCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, ChannelKind::Software);
        assert_eq!(record.topic_prefix(), "/TLdnl8aKqCL/2c9459fd");
    }

    #[test]
    fn should_not_leak_secret_in_debug_output() {
        let debug = format!("{:?}", record(ChannelKind::Hardware, "hw"));
        assert!(!debug.contains("secret\""));
        assert!(debug.contains("***"));
    }
}
