//! Aggregate of all data call results gathered during one check.
//!
//! Results are keyed by call type and resource. ROA validations are keyed by
//! the `(asn, prefix)` pair; every other call by a single resource string.
//! Storing into an occupied slot replaces it.

use crate::lens::ripestat::decode::{DecodedRecord, ErrorRecord, Roa};
use crate::lens::ripestat::endpoint::Endpoint;
use crate::lens::ripestat::status::StatusTag;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

/// Kind of call stored in the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Announced,
    AsOverview,
    Consistency,
    Network,
    Roa,
    Whois,
    BgpState,
    RisPrefixes,
}

impl CallType {
    /// The data call backing this call type
    pub fn endpoint(&self) -> Endpoint {
        match self {
            CallType::Announced => Endpoint::AnnouncedPrefixes,
            CallType::AsOverview => Endpoint::AsOverview,
            CallType::Consistency => Endpoint::AsRoutingConsistency,
            CallType::Network => Endpoint::NetworkInfo,
            CallType::Roa => Endpoint::RpkiValidation,
            CallType::Whois => Endpoint::Whois,
            CallType::BgpState => Endpoint::BgpState,
            CallType::RisPrefixes => Endpoint::RisPrefixes,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CallType::Announced => "announced",
            CallType::AsOverview => "as_overview",
            CallType::Consistency => "consistency",
            CallType::Network => "network",
            CallType::Roa => "roa",
            CallType::Whois => "whois",
            CallType::BgpState => "bgp_state",
            CallType::RisPrefixes => "ris_prefixes",
        }
    }
}

impl From<Endpoint> for CallType {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::AnnouncedPrefixes => CallType::Announced,
            Endpoint::AsOverview => CallType::AsOverview,
            Endpoint::AsRoutingConsistency => CallType::Consistency,
            Endpoint::NetworkInfo => CallType::Network,
            Endpoint::RpkiValidation => CallType::Roa,
            Endpoint::Whois => CallType::Whois,
            Endpoint::BgpState => CallType::BgpState,
            Endpoint::RisPrefixes => CallType::RisPrefixes,
        }
    }
}

impl Display for CallType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Key of a slot within one call type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKey {
    Single(String),
    Pair { asn: String, prefix: String },
}

impl ResourceKey {
    pub fn pair(asn: impl Into<String>, prefix: impl Into<String>) -> Self {
        ResourceKey::Pair {
            asn: asn.into(),
            prefix: prefix.into(),
        }
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKey::Single(resource) => write!(f, "{}", resource),
            ResourceKey::Pair { asn, prefix } => write!(f, "{} {}", asn, prefix),
        }
    }
}

// JSON object keys must be strings
impl Serialize for ResourceKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for ResourceKey {
    fn from(value: &str) -> Self {
        ResourceKey::Single(value.to_string())
    }
}

impl From<String> for ResourceKey {
    fn from(value: String) -> Self {
        ResourceKey::Single(value)
    }
}

impl<A: Into<String>, P: Into<String>> From<(A, P)> for ResourceKey {
    fn from((asn, prefix): (A, P)) -> Self {
        ResourceKey::pair(asn, prefix)
    }
}

/// A failed slot, as returned by [`ResourceContext::errors`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotError<'a> {
    pub call_type: CallType,
    pub key: &'a ResourceKey,
    pub record: &'a ErrorRecord,
}

/// All results of one check, keyed by call type and resource
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceContext {
    /// The resolved ASN, digits only
    pub asn: String,
    /// Options the check ran with
    pub opts: BTreeMap<String, String>,
    pub calls: BTreeMap<CallType, BTreeMap<ResourceKey, DecodedRecord>>,
}

impl ResourceContext {
    pub fn new(asn: impl Into<String>) -> Self {
        Self {
            asn: asn.into(),
            ..Default::default()
        }
    }

    pub fn with_opt(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.insert(key.into(), value.into());
        self
    }

    /// Store `record` under `call_type`/`key`, replacing any previous value
    pub fn store(
        mut self,
        call_type: CallType,
        key: impl Into<ResourceKey>,
        record: DecodedRecord,
    ) -> Self {
        self.calls
            .entry(call_type)
            .or_default()
            .insert(key.into(), record);
        self
    }

    pub fn get(&self, call_type: CallType, key: &ResourceKey) -> Option<&DecodedRecord> {
        self.calls.get(&call_type)?.get(key)
    }

    /// All slots of one call type
    pub fn slots(
        &self,
        call_type: CallType,
    ) -> impl Iterator<Item = (&ResourceKey, &DecodedRecord)> {
        self.calls.get(&call_type).into_iter().flatten()
    }

    /// Whether `prefix` is among the prefixes announced by `asn`
    pub fn is_announced(&self, asn: &str, prefix: &str) -> bool {
        match self.get(CallType::Announced, &asn.into()) {
            Some(DecodedRecord::Announced(announced)) => {
                announced.prefixes.iter().any(|p| p == prefix)
            }
            _ => false,
        }
    }

    /// Whether the route `asn`/`prefix` validated as RPKI valid
    pub fn is_roa_valid(&self, asn: &str, prefix: &str) -> bool {
        match self.get(CallType::Roa, &ResourceKey::pair(asn, prefix)) {
            Some(DecodedRecord::Roa(validation)) => validation.status == StatusTag::Valid,
            _ => false,
        }
    }

    /// First ROA marked valid for the route `asn`/`prefix`
    pub fn first_valid_roa(&self, asn: &str, prefix: &str) -> Option<&Roa> {
        match self.get(CallType::Roa, &ResourceKey::pair(asn, prefix)) {
            Some(DecodedRecord::Roa(validation)) => {
                validation.roas.iter().find(|roa| roa.validity == "valid")
            }
            _ => None,
        }
    }

    /// Number of ROAs considered when validating `asn`/`prefix`
    pub fn roa_count(&self, asn: &str, prefix: &str) -> usize {
        match self.get(CallType::Roa, &ResourceKey::pair(asn, prefix)) {
            Some(DecodedRecord::Roa(validation)) => validation.roas.len(),
            _ => 0,
        }
    }

    /// Whether the routing registry has a route object for `asn`/`prefix`
    pub fn in_whois(&self, asn: &str, prefix: &str) -> bool {
        match self.get(CallType::Consistency, &asn.into()) {
            Some(DecodedRecord::Consistency(consistency)) => consistency
                .prefixes
                .get(prefix)
                .is_some_and(|p| p.in_whois),
            _ => false,
        }
    }

    /// Prefixes known for `asn` from BGP or the registry, sorted
    pub fn prefixes(&self, asn: &str) -> Vec<String> {
        let key = ResourceKey::from(asn);
        let mut prefixes = BTreeSet::new();
        if let Some(DecodedRecord::Announced(announced)) = self.get(CallType::Announced, &key) {
            prefixes.extend(announced.prefixes.iter().cloned());
        }
        if let Some(DecodedRecord::Consistency(consistency)) =
            self.get(CallType::Consistency, &key)
        {
            prefixes.extend(consistency.prefixes.keys().cloned());
        }
        prefixes.into_iter().collect()
    }

    /// All slots holding an error record
    pub fn errors(&self) -> Vec<SlotError<'_>> {
        self.calls
            .iter()
            .flat_map(|(call_type, slots)| {
                slots.iter().filter_map(move |(key, record)| {
                    record.as_error().map(|record| SlotError {
                        call_type: *call_type,
                        key,
                        record,
                    })
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::ripestat::decode::{
        AnnouncedPrefixes, ErrorSource, PrefixConsistency, RoaValidation, RoutingConsistency,
    };
    use serde_json::json;

    fn announced(prefixes: &[&str]) -> DecodedRecord {
        DecodedRecord::Announced(AnnouncedPrefixes {
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        })
    }

    fn roa(origin: &str, prefix: &str, max_length: u8, validity: &str) -> Roa {
        Roa {
            origin: origin.to_string(),
            prefix: prefix.to_string(),
            max_length,
            validity: validity.to_string(),
        }
    }

    #[test]
    fn test_store_last_write_wins() {
        let ctx = ResourceContext::new("3333")
            .store(CallType::Announced, "3333", announced(&["193.0.0.0/21"]))
            .store(CallType::Announced, "3333", announced(&["193.0.10.0/23"]));

        assert_eq!(ctx.calls[&CallType::Announced].len(), 1);
        assert_eq!(
            ctx.get(CallType::Announced, &"3333".into()),
            Some(&announced(&["193.0.10.0/23"]))
        );
        assert!(!ctx.is_announced("3333", "193.0.0.0/21"));
        assert!(ctx.is_announced("3333", "193.0.10.0/23"));
    }

    #[test]
    fn test_store_leaves_other_slots() {
        let ctx = ResourceContext::new("3333")
            .store(CallType::Announced, "3333", announced(&["193.0.0.0/21"]))
            .store(CallType::Announced, "3334", announced(&[]))
            .store(
                CallType::Roa,
                ("3333", "193.0.0.0/21"),
                DecodedRecord::Roa(RoaValidation {
                    status: StatusTag::Valid,
                    roas: vec![],
                }),
            );
        assert_eq!(ctx.calls[&CallType::Announced].len(), 2);
        assert!(ctx.is_announced("3333", "193.0.0.0/21"));
        assert!(ctx.is_roa_valid("3333", "193.0.0.0/21"));
    }

    #[test]
    fn test_readers_on_empty_context() {
        let ctx = ResourceContext::new("3333");
        assert!(!ctx.is_announced("3333", "193.0.0.0/21"));
        assert!(!ctx.is_roa_valid("3333", "193.0.0.0/21"));
        assert!(ctx.first_valid_roa("3333", "193.0.0.0/21").is_none());
        assert!(!ctx.in_whois("3333", "193.0.0.0/21"));
        assert_eq!(ctx.roa_count("3333", "193.0.0.0/21"), 0);
        assert!(ctx.prefixes("3333").is_empty());
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_readers_on_mismatched_shapes() {
        let error = DecodedRecord::error("timeout", ErrorSource::Url("u".to_string()));
        let ctx = ResourceContext::new("3333")
            .store(CallType::Announced, "3333", error.clone())
            .store(CallType::Roa, ("3333", "193.0.0.0/21"), announced(&["x"]))
            .store(CallType::Consistency, "3333", error);

        assert!(!ctx.is_announced("3333", "193.0.0.0/21"));
        assert!(!ctx.is_roa_valid("3333", "193.0.0.0/21"));
        assert!(ctx.first_valid_roa("3333", "193.0.0.0/21").is_none());
        assert!(!ctx.in_whois("3333", "193.0.0.0/21"));
        assert_eq!(ctx.errors().len(), 2);
    }

    #[test]
    fn test_first_valid_roa() {
        let ctx = ResourceContext::new("3333").store(
            CallType::Roa,
            ("3333", "193.0.0.0/21"),
            DecodedRecord::Roa(RoaValidation {
                status: StatusTag::Valid,
                roas: vec![
                    roa("64496", "193.0.0.0/16", 16, "invalid_asn"),
                    roa("3333", "193.0.0.0/21", 21, "valid"),
                    roa("3333", "193.0.0.0/20", 24, "valid"),
                ],
            }),
        );
        let first = ctx.first_valid_roa("3333", "193.0.0.0/21").unwrap();
        assert_eq!(first.max_length, 21);
        assert_eq!(ctx.roa_count("3333", "193.0.0.0/21"), 3);
    }

    #[test]
    fn test_prefixes_union() {
        let mut prefixes = BTreeMap::new();
        prefixes.insert(
            "193.0.10.0/23".to_string(),
            PrefixConsistency {
                in_bgp: false,
                in_whois: true,
                irr_sources: vec!["RIPE".to_string()],
            },
        );
        let ctx = ResourceContext::new("3333")
            .store(CallType::Announced, "3333", announced(&["193.0.0.0/21"]))
            .store(
                CallType::Consistency,
                "3333",
                DecodedRecord::Consistency(RoutingConsistency {
                    prefixes,
                    peers: BTreeMap::new(),
                }),
            );
        assert_eq!(
            ctx.prefixes("3333"),
            vec!["193.0.0.0/21".to_string(), "193.0.10.0/23".to_string()]
        );
        assert!(ctx.in_whois("3333", "193.0.10.0/23"));
        assert!(!ctx.in_whois("3333", "193.0.0.0/21"));
    }

    #[test]
    fn test_serialize_context() {
        let ctx = ResourceContext::new("3333")
            .with_opt("resource", "AS3333")
            .store(CallType::Announced, "3333", announced(&["193.0.0.0/21"]))
            .store(
                CallType::Roa,
                ("3333", "193.0.0.0/21"),
                DecodedRecord::Roa(RoaValidation {
                    status: StatusTag::Valid,
                    roas: vec![],
                }),
            );
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(
            value,
            json!({
                "asn": "3333",
                "opts": {"resource": "AS3333"},
                "calls": {
                    "announced": {"3333": {"prefixes": ["193.0.0.0/21"]}},
                    "roa": {"3333 193.0.0.0/21": {"status": "valid", "roas": []}}
                }
            })
        );
    }

    #[test]
    fn test_call_type_endpoint_mapping() {
        for endpoint in Endpoint::all() {
            assert_eq!(CallType::from(*endpoint).endpoint(), *endpoint);
        }
    }
}
