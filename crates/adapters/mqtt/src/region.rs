//! Regional cloud endpoints, keyed by the account's country code.

/// REST server and MQTT broker serving one country.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub country: &'static str,
    pub name: &'static str,
    pub server_host: &'static str,
    pub broker_host: &'static str,
}

const fn region(
    country: &'static str,
    name: &'static str,
    server_host: &'static str,
    broker_host: &'static str,
) -> Region {
    Region {
        country,
        name,
        server_host,
        broker_host,
    }
}

const EU_SERVER: &str = "eumeshcloud.magichue.net";
const EU_BROKER: &str = "eu.meshbroker.magichue.net";

pub const REGIONS: &[Region] = &[
    region("US", "United States", "usmeshcloud.magichue.net", "us.meshbroker.magichue.net"),
    region("AU", "Australia", "oameshcloud.magichue.net", "oa.meshbroker.magichue.net"),
    region("AL", "Avalon", "ttmeshcloud.magichue.net", "tt.meshbroker.magichue.net"),
    region("CN", "China", "cnmeshcloud.magichue.net", "cn.meshbroker.magichue.net"),
    region("GB", "England", EU_SERVER, EU_BROKER),
    region("ES", "Espana", EU_SERVER, EU_BROKER),
    region("FR", "France", EU_SERVER, EU_BROKER),
    region("DE", "Germany", EU_SERVER, EU_BROKER),
    region("IT", "Italy", EU_SERVER, EU_BROKER),
    region("JP", "Japan", "dymeshcloud.magichue.net", "dy.meshbroker.magichue.net"),
    region("RU", "Russia", EU_SERVER, EU_BROKER),
];

/// Region for a country code, case-insensitive. Unknown codes fall back to
/// the United States.
#[must_use]
pub fn lookup(country: &str) -> &'static Region {
    let country = country.trim();
    REGIONS
        .iter()
        .find(|region| region.country.eq_ignore_ascii_case(country))
        .unwrap_or(&REGIONS[0])
}
