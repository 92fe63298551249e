//! Broker identity and topic names derived from the control channels.
//!
//! Login and publishing use the software channel; status notifications are
//! read from the hardware channel.

use meshlight_domain::credentials::ControlChannels;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub control: String,
    pub status: String,
    pub request: String,
}

impl Topics {
    #[must_use]
    pub fn new(channels: &ControlChannels) -> Self {
        let software = channels.software.topic_prefix();
        Self {
            control: format!("{software}/control"),
            status: format!("{}/subStatus", channels.hardware.topic_prefix()),
            request: format!("{software}/request"),
        }
    }
}

/// `(username, password)` for the broker login.
#[must_use]
pub fn login(channels: &ControlChannels) -> (String, String) {
    let software = &channels.software;
    (
        format!("{}&{}", software.device_name, software.product_key),
        software.device_secret.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlight_domain::credentials::{ChannelKind, ControlCredentials};

    fn channels() -> ControlChannels {
        ControlChannels::from_records([
            ControlCredentials {
                kind: ChannelKind::Hardware,
                device_name: "hwdn".to_string(),
                product_key: "LCTLdnl8aKqCI".to_string(),
                device_secret: "hw-secret".to_string(),
            },
            ControlCredentials {
                kind: ChannelKind::Software,
                device_name: "swdn".to_string(),
                product_key: "TLdnl8aKqCL".to_string(),
                device_secret: "sw-secret".to_string(),
            },
        ])
        .unwrap()
    }

    #[test]
    fn should_derive_topics_from_both_channels() {
        let topics = Topics::new(&channels());
        assert_eq!(topics.control, "/TLdnl8aKqCL/swdn/control");
        assert_eq!(topics.status, "/LCTLdnl8aKqCI/hwdn/subStatus");
        assert_eq!(topics.request, "/TLdnl8aKqCL/swdn/request");
    }

    #[test]
    fn should_log_in_with_software_channel() {
        let (username, password) = login(&channels());
        assert_eq!(username, "swdn&TLdnl8aKqCL");
        assert_eq!(password, "sw-secret");
    }
}
