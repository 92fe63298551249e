//! Session bootstrap — loads the roster and broker credentials once.

use meshlight_domain::credentials::ControlChannels;
use meshlight_domain::device::Roster;

use crate::error::SetupError;
use crate::ports::CloudSession;

/// Everything fetched from the cloud before the broker connection opens.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub roster: Roster,
    pub channels: ControlChannels,
}

/// Log in, then fetch the roster and the control channels.
///
/// # Errors
///
/// Every failure is fatal to setup: a refused login, an unreachable
/// service, an account without devices, duplicate mesh addresses or a
/// missing control channel.
pub async fn bootstrap_roster(session: &impl CloudSession) -> Result<Bootstrap, SetupError> {
    session.login().await?;

    let devices = session.fetch_devices().await?;
    if devices.is_empty() {
        return Err(SetupError::EmptyRoster);
    }
    let roster = Roster::new(devices)?;

    let credentials = session.fetch_broker_credentials().await?;
    let channels = ControlChannels::from_records(credentials).map_err(SetupError::MissingChannel)?;

    tracing::info!(
        devices = roster.devices().len(),
        lights = roster.lights().count(),
        groups = roster.groups().len(),
        "roster loaded"
    );
    Ok(Bootstrap { roster, channels })
}
