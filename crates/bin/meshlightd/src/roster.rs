//! Cloud session served from the `[roster]` configuration section.

use std::future::Future;

use meshlight_app::ports::{CloudError, CloudSession};
use meshlight_domain::credentials::ControlCredentials;
use meshlight_domain::device::Device;

use crate::config::RosterConfig;

/// Account data copied by hand from the vendor app into `meshlight.toml`.
pub struct StaticRoster {
    roster: RosterConfig,
}

impl StaticRoster {
    pub fn new(roster: RosterConfig) -> Self {
        Self { roster }
    }
}

impl CloudSession for StaticRoster {
    fn login(&self) -> impl Future<Output = Result<(), CloudError>> + Send {
        let result = if self.roster.credentials.is_empty() {
            Err(CloudError::Authentication(
                "no broker credentials configured in [roster]".to_string(),
            ))
        } else {
            Ok(())
        };
        std::future::ready(result)
    }

    fn fetch_devices(&self) -> impl Future<Output = Result<Vec<Device>, CloudError>> + Send {
        std::future::ready(Ok(self.roster.devices.clone()))
    }

    fn fetch_broker_credentials(
        &self,
    ) -> impl Future<Output = Result<Vec<ControlCredentials>, CloudError>> + Send {
        std::future::ready(Ok(self.roster.credentials.clone()))
    }
}
