//! RIPEstat data call catalog and URL construction.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Default RIPEstat API host
pub const RIPESTAT_BASE_URL: &str = "https://stat.ripe.net";

/// Known RIPEstat data calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Endpoint {
    AnnouncedPrefixes,
    AsOverview,
    AsRoutingConsistency,
    NetworkInfo,
    RpkiValidation,
    Whois,
    BgpState,
    RisPrefixes,
}

impl Endpoint {
    pub fn all() -> &'static [Endpoint] {
        &[
            Endpoint::AnnouncedPrefixes,
            Endpoint::AsOverview,
            Endpoint::AsRoutingConsistency,
            Endpoint::NetworkInfo,
            Endpoint::RpkiValidation,
            Endpoint::Whois,
            Endpoint::BgpState,
            Endpoint::RisPrefixes,
        ]
    }

    /// Data call name as used in the URL path
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::AnnouncedPrefixes => "announced-prefixes",
            Endpoint::AsOverview => "as-overview",
            Endpoint::AsRoutingConsistency => "as-routing-consistency",
            Endpoint::NetworkInfo => "network-info",
            Endpoint::RpkiValidation => "rpki-validation",
            Endpoint::Whois => "whois",
            Endpoint::BgpState => "bgp-state",
            Endpoint::RisPrefixes => "ris-prefixes",
        }
    }

    /// URL of the data call's documentation page
    pub fn methodology_url(&self) -> String {
        methodology_url(self.name())
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase().replace('_', "-");
        Endpoint::all()
            .iter()
            .find(|e| e.name() == name)
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown RIPEstat endpoint '{}'. Valid endpoints: {}",
                    s,
                    Endpoint::all()
                        .iter()
                        .map(|e| e.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// A single data call request: endpoint name plus ordered query parameters.
///
/// The endpoint is kept as a plain name so that calls to data calls outside
/// [`Endpoint`] can still be issued and classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallDescriptor {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl CallDescriptor {
    pub fn new(endpoint: Endpoint) -> Self {
        Self::named(endpoint.name())
    }

    /// Descriptor for an arbitrary data call name
    pub fn named(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: vec![],
        }
    }

    /// Append a query parameter; order is preserved in the URL
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn url(&self, base_url: &str) -> String {
        build_url_with_base(base_url, &self.endpoint, &self.params)
    }
}

/// Build a data call URL against the public RIPEstat host.
///
/// Parameters are joined in the given order and concatenated literally,
/// without any re-encoding.
pub fn build_url<K: AsRef<str>, V: AsRef<str>>(endpoint: &str, params: &[(K, V)]) -> String {
    build_url_with_base(RIPESTAT_BASE_URL, endpoint, params)
}

pub fn build_url_with_base<K: AsRef<str>, V: AsRef<str>>(
    base_url: &str,
    endpoint: &str,
    params: &[(K, V)],
) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}/data/{}/data.json?{}",
        base_url.trim_end_matches('/'),
        endpoint,
        query
    )
}

/// Documentation URL for a data call name. Not used when decoding.
pub fn methodology_url(endpoint: &str) -> String {
    format!(
        "{}/docs/data-api/api-endpoints/{}",
        RIPESTAT_BASE_URL, endpoint
    )
}
