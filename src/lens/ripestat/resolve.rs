//! Resolution of a user-supplied resource into an ASN.
//!
//! `AS3333`, `as3333` and `3333` resolve locally. Anything else is treated as
//! an IP address or prefix and resolved through the `network-info` data call.

use crate::lens::ripestat::context::{CallType, ResourceContext};
use crate::lens::ripestat::decode::DecodedRecord;
use crate::lens::ripestat::transport::HttpGet;
use crate::lens::ripestat::RipestatLens;
use thiserror::Error;
use tracing::debug;

/// The resource could not be turned into an ASN
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid resource '{token}': {reason}")]
    InvalidArgument { token: String, reason: String },
}

impl ResolveError {
    fn invalid(token: &str, reason: impl Into<String>) -> Self {
        ResolveError::InvalidArgument {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

/// The token is not a plain AS number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not an AS number")]
pub struct AsnParseFailure(pub String);

/// Parse `AS<digits>` (any case) or `<digits>` into the bare digits.
///
/// ```
/// use ripecheck::lens::ripestat::parse_asn;
///
/// assert_eq!(parse_asn("AS3333").unwrap(), "3333");
/// assert_eq!(parse_asn("as3333").unwrap(), "3333");
/// assert!(parse_asn("193.0.0.0/21").is_err());
/// ```
pub fn parse_asn(token: &str) -> Result<String, AsnParseFailure> {
    let trimmed = token.trim();
    let digits = match trimmed.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("as") => &trimmed[2..],
        _ => trimmed,
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AsnParseFailure(token.to_string()));
    }

    digits
        .parse::<u32>()
        .map(|asn| asn.to_string())
        .map_err(|_| AsnParseFailure(token.to_string()))
}

/// Resolve `token` to an ASN, looking it up with `network-info` if needed
pub fn resolve<T: HttpGet>(
    lens: &RipestatLens<T>,
    token: &str,
) -> Result<String, ResolveError> {
    let failure = match parse_asn(token) {
        Ok(asn) => return Ok(asn),
        Err(failure) => failure,
    };
    debug!("{}; looking up origin with network-info", failure);

    let resource = token.trim();
    let ctx = lens.network(ResourceContext::default(), resource);
    match ctx.get(CallType::Network, &resource.into()) {
        Some(DecodedRecord::Network(info)) => parse_asn(&info.asn).map_err(|_| {
            ResolveError::invalid(
                token,
                format!("network-info returned unexpected ASN '{}'", info.asn),
            )
        }),
        Some(DecodedRecord::Error(error)) => {
            Err(ResolveError::invalid(token, error.error.clone()))
        }
        _ => Err(ResolveError::invalid(token, "unexpected network-info result")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::ripestat::transport::canned::CannedTransport;
    use serde_json::json;

    const NETWORK_INFO_URL: &str =
        "https://stat.ripe.net/data/network-info/data.json?resource=193.0.0.1";

    #[test]
    fn test_parse_asn() {
        assert_eq!(parse_asn("AS3333").unwrap(), "3333");
        assert_eq!(parse_asn("as3333").unwrap(), "3333");
        assert_eq!(parse_asn("aS3333").unwrap(), "3333");
        assert_eq!(parse_asn("3333").unwrap(), "3333");
        assert_eq!(parse_asn(" 4200000000 ").unwrap(), "4200000000");
        assert_eq!(parse_asn("AS03333").unwrap(), "3333");
    }

    #[test]
    fn test_parse_asn_rejects_non_numeric() {
        let tokens = [
            "",
            "AS",
            "ASN3333",
            "1.1.1.1",
            "193.0.0.0/21",
            "AS-3333",
            "+3333",
            "99999999999",
            "ÄS1",
        ];
        for token in tokens {
            assert_eq!(
                parse_asn(token),
                Err(AsnParseFailure(token.to_string())),
                "token {:?}",
                token
            );
        }
    }

    #[test]
    fn test_resolve_numeric_without_lookup() {
        let transport = CannedTransport::new();
        let lens = RipestatLens::with_transport(&transport);
        assert_eq!(resolve(&lens, "AS3333").unwrap(), "3333");
        assert_eq!(resolve(&lens, "3333").unwrap(), "3333");
        assert!(transport.requested().is_empty());
    }

    #[test]
    fn test_resolve_address_through_network_info() {
        let transport = CannedTransport::new().respond(
            NETWORK_INFO_URL,
            json!({
                "status": "ok",
                "data": {"asns": ["3333"], "prefix": "193.0.0.0/21"}
            }),
        );
        let lens = RipestatLens::with_transport(&transport);
        assert_eq!(resolve(&lens, "193.0.0.1").unwrap(), "3333");
        assert_eq!(transport.requested(), vec![NETWORK_INFO_URL.to_string()]);
    }

    #[test]
    fn test_resolve_padded_address() {
        let transport = CannedTransport::new().respond(
            NETWORK_INFO_URL,
            json!({
                "status": "ok",
                "data": {"asns": ["3333"], "prefix": "193.0.0.0/21"}
            }),
        );
        let lens = RipestatLens::with_transport(&transport);
        assert_eq!(resolve(&lens, " 193.0.0.1 ").unwrap(), "3333");
        assert_eq!(resolve(&lens, " AS3333 ").unwrap(), "3333");
        assert_eq!(transport.requested(), vec![NETWORK_INFO_URL.to_string()]);
    }

    #[test]
    fn test_resolve_padded_error_keeps_original_token() {
        let transport = CannedTransport::new();
        let lens = RipestatLens::with_transport(&transport);
        let ResolveError::InvalidArgument { token, .. } =
            resolve(&lens, "\t10.0.0.1 ").unwrap_err();
        assert_eq!(token, "\t10.0.0.1 ");
        assert_eq!(
            transport.requested(),
            vec!["https://stat.ripe.net/data/network-info/data.json?resource=10.0.0.1".to_string()]
        );
    }

    #[test]
    fn test_resolve_lookup_error() {
        let transport = CannedTransport::new().respond(
            NETWORK_INFO_URL,
            json!({
                "status": "error",
                "data": {},
                "messages": [["error", "Invalid resource"]]
            }),
        );
        let lens = RipestatLens::with_transport(&transport);
        assert_eq!(
            resolve(&lens, "193.0.0.1"),
            Err(ResolveError::InvalidArgument {
                token: "193.0.0.1".to_string(),
                reason: "Invalid resource".to_string(),
            })
        );
    }

    #[test]
    fn test_resolve_unannounced_and_unreachable() {
        let transport = CannedTransport::new()
            .respond(
                NETWORK_INFO_URL,
                json!({"status": "ok", "data": {"asns": [], "prefix": null}}),
            )
            .fail(
                "https://stat.ripe.net/data/network-info/data.json?resource=10.0.0.1",
                "connection refused",
            );
        let lens = RipestatLens::with_transport(&transport);

        let err = resolve(&lens, "193.0.0.1").unwrap_err();
        assert!(err.to_string().contains("no origin ASN"));

        let ResolveError::InvalidArgument { token, reason } =
            resolve(&lens, "10.0.0.1").unwrap_err();
        assert_eq!(token, "10.0.0.1");
        assert!(reason.contains("connection refused"));
    }

    #[test]
    fn test_resolve_unexpected_asn_shape() {
        let transport = CannedTransport::new().respond(
            NETWORK_INFO_URL,
            json!({"status": "ok", "data": {"asns": ["{3333,3334}"], "prefix": "193.0.0.0/21"}}),
        );
        let lens = RipestatLens::with_transport(&transport);
        let err = resolve(&lens, "193.0.0.1").unwrap_err();
        assert!(err.to_string().starts_with("invalid resource '193.0.0.1'"));
    }
}
