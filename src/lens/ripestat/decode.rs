//! Per-endpoint decoding of RIPEstat `data` payloads.
//!
//! Every decoder produces a [`DecodedRecord`], which always serializes to a
//! JSON object. Failed calls, malformed payloads and endpoints without a
//! decoder all become [`DecodedRecord::Error`] so that they can be stored in
//! the context like any other result.

use crate::lens::ripestat::endpoint::Endpoint;
use crate::lens::ripestat::response::{CallMeta, CallOutcome};
use crate::lens::ripestat::status::StatusTag;
use crate::lens::utils::{string_from_scalar, strings_from_scalars};
use anyhow::{anyhow, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

// =============================================================================
// Decoded records
// =============================================================================

/// Prefixes announced by an ASN
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnouncedPrefixes {
    pub prefixes: Vec<String>,
}

/// BGP/registry consistency of one prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefixConsistency {
    pub in_bgp: bool,
    pub in_whois: bool,
    pub irr_sources: Vec<String>,
}

/// BGP/registry consistency of one peer.
///
/// A peer seen on only one side has `None` for the other side's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeerConsistency {
    pub imports_bgp: Option<bool>,
    pub imports_whois: Option<bool>,
    pub exports_bgp: Option<bool>,
    pub exports_whois: Option<bool>,
}

/// Decoded `as-routing-consistency` payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingConsistency {
    pub prefixes: BTreeMap<String, PrefixConsistency>,
    pub peers: BTreeMap<String, PeerConsistency>,
}

/// Decoded `network-info` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    /// First origin ASN
    pub asn: String,
    pub asns: Vec<String>,
    pub prefix: String,
}

/// A ROA covering the validated route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roa {
    #[serde(deserialize_with = "string_from_scalar")]
    pub origin: String,
    pub prefix: String,
    pub max_length: u8,
    pub validity: String,
}

/// Decoded `rpki-validation` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoaValidation {
    pub status: StatusTag,
    pub roas: Vec<Roa>,
}

/// A single `key: value` line of a registry object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisAttribute {
    pub key: String,
    #[serde(deserialize_with = "string_from_scalar")]
    pub value: String,
}

/// Decoded `whois` payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WhoisRecords {
    pub authorities: Vec<String>,
    pub records: Vec<Vec<WhoisAttribute>>,
    pub irr: Vec<Vec<WhoisAttribute>>,
}

/// Prefixes originated and transited by an ASN as seen by RIS
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RisPrefixes {
    pub originating: Vec<String>,
    pub transiting: Vec<String>,
}

/// Where a failed call came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorSource {
    Call(CallMeta),
    /// The call never completed; only the URL is known
    Url(String),
}

/// Stored in place of a decoded payload when a call failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub error: String,
    pub call: ErrorSource,
}

/// Normalized result of one data call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedRecord {
    Announced(AnnouncedPrefixes),
    AsOverview(Map<String, Value>),
    Consistency(RoutingConsistency),
    Network(NetworkInfo),
    Roa(RoaValidation),
    Whois(WhoisRecords),
    /// Upstream ASNs keyed by prefix
    BgpState(BTreeMap<String, Vec<u32>>),
    RisPrefixes(RisPrefixes),
    Error(ErrorRecord),
}

impl DecodedRecord {
    pub fn error(reason: impl Into<String>, call: ErrorSource) -> Self {
        DecodedRecord::Error(ErrorRecord {
            error: reason.into(),
            call,
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DecodedRecord::Error(_))
    }

    pub fn as_error(&self) -> Option<&ErrorRecord> {
        match self {
            DecodedRecord::Error(e) => Some(e),
            _ => None,
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

type Decoder = fn(Value) -> Result<DecodedRecord>;

const DECODERS: &[(Endpoint, Decoder)] = &[
    (Endpoint::AnnouncedPrefixes, decode_announced_prefixes),
    (Endpoint::AsOverview, decode_as_overview),
    (Endpoint::AsRoutingConsistency, decode_routing_consistency),
    (Endpoint::NetworkInfo, decode_network_info),
    (Endpoint::RpkiValidation, decode_rpki_validation),
    (Endpoint::Whois, decode_whois),
    (Endpoint::BgpState, decode_bgp_state),
    (Endpoint::RisPrefixes, decode_ris_prefixes),
];

fn decoder_for(endpoint: &str) -> Option<Decoder> {
    DECODERS
        .iter()
        .find(|(e, _)| e.name() == endpoint)
        .map(|(_, decoder)| *decoder)
}

/// Decode the outcome of a call to the data call named `endpoint`.
///
/// Failed outcomes are turned into error records identically for every
/// endpoint.
pub fn decode(endpoint: &str, outcome: CallOutcome) -> DecodedRecord {
    let (data, call) = match outcome {
        CallOutcome::Success { data, call } => (data, call),
        CallOutcome::ApplicationError { reason, call } => {
            return DecodedRecord::error(reason, ErrorSource::Call(call));
        }
        CallOutcome::TransportError { reason, url } => {
            return DecodedRecord::error(reason, ErrorSource::Url(url));
        }
    };

    let Some(decoder) = decoder_for(endpoint) else {
        return DecodedRecord::error(
            format!("missing decoder for endpoint {}", endpoint),
            ErrorSource::Call(call),
        );
    };

    match decoder(data) {
        Ok(record) => record,
        Err(e) => {
            warn!("malformed {} payload from {}: {}", endpoint, call.url, e);
            DecodedRecord::error(
                format!("malformed {} payload: {}", endpoint, e),
                ErrorSource::Call(call),
            )
        }
    }
}

fn decode_announced_prefixes(data: Value) -> Result<DecodedRecord> {
    #[derive(Deserialize)]
    struct PrefixItem {
        prefix: String,
    }

    #[derive(Deserialize)]
    struct Payload {
        prefixes: Vec<PrefixItem>,
    }

    let payload: Payload = serde_json::from_value(data)?;
    Ok(DecodedRecord::Announced(AnnouncedPrefixes {
        prefixes: payload.prefixes.into_iter().map(|p| p.prefix).collect(),
    }))
}

fn decode_as_overview(data: Value) -> Result<DecodedRecord> {
    match data {
        Value::Object(map) => Ok(DecodedRecord::AsOverview(map)),
        other => Err(anyhow!("expected an object, got {}", other)),
    }
}

fn decode_routing_consistency(data: Value) -> Result<DecodedRecord> {
    #[derive(Deserialize)]
    struct PrefixItem {
        prefix: String,
        #[serde(default)]
        in_bgp: bool,
        #[serde(default)]
        in_whois: bool,
        #[serde(default)]
        irr_sources: Vec<String>,
    }

    #[derive(Deserialize)]
    struct PeerItem {
        #[serde(deserialize_with = "string_from_scalar")]
        peer: String,
        in_bgp: Option<bool>,
        in_whois: Option<bool>,
    }

    #[derive(Deserialize)]
    struct Payload {
        #[serde(default)]
        prefixes: Vec<PrefixItem>,
        #[serde(default)]
        imports: Vec<PeerItem>,
        #[serde(default)]
        exports: Vec<PeerItem>,
    }

    let payload: Payload = serde_json::from_value(data)?;

    // duplicate prefixes and peers: last one wins
    let prefixes = payload
        .prefixes
        .into_iter()
        .map(|p| {
            (
                p.prefix,
                PrefixConsistency {
                    in_bgp: p.in_bgp,
                    in_whois: p.in_whois,
                    irr_sources: p.irr_sources,
                },
            )
        })
        .collect();

    let mut peers: BTreeMap<String, PeerConsistency> = BTreeMap::new();
    for import in payload.imports {
        let entry = peers.entry(import.peer).or_default();
        entry.imports_bgp = import.in_bgp;
        entry.imports_whois = import.in_whois;
    }
    for export in payload.exports {
        let entry = peers.entry(export.peer).or_default();
        entry.exports_bgp = export.in_bgp;
        entry.exports_whois = export.in_whois;
    }

    Ok(DecodedRecord::Consistency(RoutingConsistency {
        prefixes,
        peers,
    }))
}

fn decode_network_info(data: Value) -> Result<DecodedRecord> {
    #[derive(Deserialize)]
    struct Payload {
        #[serde(default, deserialize_with = "strings_from_scalars")]
        asns: Vec<String>,
        #[serde(default)]
        prefix: Option<String>,
    }

    let payload: Payload = serde_json::from_value(data)?;
    let prefix = payload.prefix.unwrap_or_default();
    let asn = payload
        .asns
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("no origin ASN for prefix '{}'", prefix))?;

    Ok(DecodedRecord::Network(NetworkInfo {
        asn,
        asns: payload.asns,
        prefix,
    }))
}

fn decode_rpki_validation(data: Value) -> Result<DecodedRecord> {
    #[derive(Deserialize)]
    struct Payload {
        status: StatusTag,
        #[serde(default)]
        validating_roas: Vec<Roa>,
    }

    let payload: Payload = serde_json::from_value(data)?;
    Ok(DecodedRecord::Roa(RoaValidation {
        status: payload.status,
        roas: payload.validating_roas,
    }))
}

fn decode_whois(data: Value) -> Result<DecodedRecord> {
    #[derive(Deserialize)]
    struct Payload {
        #[serde(default)]
        authorities: Vec<String>,
        #[serde(default)]
        records: Vec<Vec<WhoisAttribute>>,
        #[serde(default)]
        irr_records: Vec<Vec<WhoisAttribute>>,
    }

    let payload: Payload = serde_json::from_value(data)?;
    Ok(DecodedRecord::Whois(WhoisRecords {
        authorities: payload.authorities,
        records: payload.records,
        irr: payload.irr_records,
    }))
}

fn decode_bgp_state(data: Value) -> Result<DecodedRecord> {
    #[derive(Deserialize)]
    struct Route {
        target_prefix: String,
        #[serde(default)]
        path: Vec<u32>,
    }

    #[derive(Deserialize)]
    struct Payload {
        bgp_state: Vec<Route>,
    }

    let payload: Payload = serde_json::from_value(data)?;

    let mut upstreams: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for route in payload.bgp_state {
        let entry = upstreams.entry(route.target_prefix).or_default();
        // the upstream is the hop right before the origin
        if route.path.len() >= 2 {
            entry.push(route.path[route.path.len() - 2]);
        }
    }

    let upstreams = upstreams
        .into_iter()
        .map(|(prefix, asns)| (prefix, asns.into_iter().unique().collect()))
        .collect();
    Ok(DecodedRecord::BgpState(upstreams))
}

fn decode_ris_prefixes(data: Value) -> Result<DecodedRecord> {
    #[derive(Deserialize, Default)]
    struct Family {
        #[serde(default)]
        originating: Vec<String>,
        #[serde(default)]
        transiting: Vec<String>,
    }

    #[derive(Deserialize)]
    struct Families {
        #[serde(default)]
        v4: Family,
        #[serde(default)]
        v6: Family,
    }

    #[derive(Deserialize)]
    struct Payload {
        prefixes: Families,
    }

    let Payload {
        prefixes: Families { v4, v6 },
    } = serde_json::from_value(data)?;

    Ok(DecodedRecord::RisPrefixes(RisPrefixes {
        originating: v4.originating.into_iter().chain(v6.originating).collect(),
        transiting: v4.transiting.into_iter().chain(v6.transiting).collect(),
    }))
}
