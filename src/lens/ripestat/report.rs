//! Per-prefix summary rows of a finished check.

use crate::lens::ripestat::context::ResourceContext;
use crate::lens::utils::OutputFormat;
use serde::Serialize;

/// One row per prefix known for the checked ASN
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct CheckRow {
    pub asn: String,
    pub prefix: String,
    /// Announced in BGP
    #[serde(rename = "bgp?")]
    #[cfg_attr(feature = "display", tabled(rename = "bgp?"))]
    pub bgp: bool,
    /// Route object present in the routing registry
    #[serde(rename = "whois?")]
    #[cfg_attr(feature = "display", tabled(rename = "whois?"))]
    pub whois: bool,
    /// RPKI valid
    #[serde(rename = "roa?")]
    #[cfg_attr(feature = "display", tabled(rename = "roa?"))]
    pub roa: bool,
    #[serde(rename = "#roas")]
    #[cfg_attr(feature = "display", tabled(rename = "#roas"))]
    pub roas: usize,
    #[serde(rename = "matching-roa")]
    #[cfg_attr(feature = "display", tabled(rename = "matching-roa"))]
    pub matching_roa: String,
    #[serde(rename = "max-length")]
    #[cfg_attr(feature = "display", tabled(rename = "max-length"))]
    pub max_length: String,
}

const PSV_HEADER: &str = "asn|prefix|bgp?|whois?|roa?|#roas|matching-roa|max-length";

/// Build the summary rows for the context's ASN, sorted by prefix
pub fn check_rows(ctx: &ResourceContext) -> Vec<CheckRow> {
    let asn = ctx.asn.as_str();
    ctx.prefixes(asn)
        .into_iter()
        .map(|prefix| {
            let matching = ctx.first_valid_roa(asn, &prefix);
            CheckRow {
                asn: asn.to_string(),
                bgp: ctx.is_announced(asn, &prefix),
                whois: ctx.in_whois(asn, &prefix),
                roa: ctx.is_roa_valid(asn, &prefix),
                roas: ctx.roa_count(asn, &prefix),
                matching_roa: matching
                    .map(|roa| format!("AS{} {}", roa.origin, roa.prefix))
                    .unwrap_or_else(|| "-".to_string()),
                max_length: matching
                    .map(|roa| roa.max_length.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                prefix,
            }
        })
        .collect()
}

/// Render rows in the requested output format
///
/// Note: Table and Markdown formats require the `display` feature. Without
/// it they fall back to pretty JSON.
pub fn format_rows(rows: &[CheckRow], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table | OutputFormat::Markdown => {
            #[cfg(feature = "display")]
            {
                use tabled::settings::Style;
                use tabled::Table;
                let mut table = Table::new(rows);
                if format == OutputFormat::Markdown {
                    table.with(Style::markdown());
                } else {
                    table.with(Style::rounded());
                }
                table.to_string()
            }
            #[cfg(not(feature = "display"))]
            {
                serde_json::to_string_pretty(rows).unwrap_or_default()
            }
        }
        OutputFormat::Json => serde_json::to_string(rows).unwrap_or_default(),
        OutputFormat::JsonPretty => serde_json::to_string_pretty(rows).unwrap_or_default(),
        OutputFormat::JsonLine => rows
            .iter()
            .filter_map(|row| serde_json::to_string(row).ok())
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Psv => {
            let mut output = String::from(PSV_HEADER);
            for r in rows {
                output.push_str(&format!(
                    "\n{}|{}|{}|{}|{}|{}|{}|{}",
                    r.asn, r.prefix, r.bgp, r.whois, r.roa, r.roas, r.matching_roa, r.max_length
                ));
            }
            output
        }
    }
}
