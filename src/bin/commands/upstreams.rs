use clap::Args;
use itertools::Itertools;
use ripecheck::lens::ripestat::{CallType, DecodedRecord, ResourceContext, RipestatLens};
use ripecheck::lens::utils::OutputFormat;
use std::collections::BTreeMap;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Arguments for the Upstreams command
#[derive(Args)]
pub struct UpstreamsArgs {
    /// ASN, IP address or prefix
    #[clap(value_name = "RESOURCE")]
    pub resource: String,
}

#[derive(Tabled)]
struct UpstreamRow {
    prefix: String,
    upstreams: String,
}

pub fn run(lens: &RipestatLens, args: UpstreamsArgs, output_format: OutputFormat) {
    let ctx = lens.bgp_state(ResourceContext::default(), &args.resource);
    let upstreams = match ctx.get(CallType::BgpState, &args.resource.as_str().into()) {
        Some(DecodedRecord::BgpState(upstreams)) => upstreams,
        Some(DecodedRecord::Error(e)) => {
            eprintln!("ERROR: {}", e.error);
            return;
        }
        _ => {
            eprintln!("ERROR: unexpected bgp-state result for {}", args.resource);
            return;
        }
    };

    format_output(upstreams, output_format);
}

fn format_output(upstreams: &BTreeMap<String, Vec<u32>>, output_format: OutputFormat) {
    let rows: Vec<UpstreamRow> = upstreams
        .iter()
        .map(|(prefix, asns)| UpstreamRow {
            prefix: prefix.clone(),
            upstreams: asns.iter().map(|asn| format!("AS{}", asn)).join(" "),
        })
        .collect();

    match output_format {
        OutputFormat::Table => {
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        OutputFormat::Markdown => {
            println!("{}", Table::new(rows).with(Style::markdown()));
        }
        OutputFormat::Json => match serde_json::to_string(upstreams) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("ERROR: Failed to serialize to JSON: {}", e),
        },
        OutputFormat::JsonPretty => match serde_json::to_string_pretty(upstreams) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("ERROR: Failed to serialize to JSON: {}", e),
        },
        OutputFormat::JsonLine => {
            for (prefix, asns) in upstreams {
                println!("{}", serde_json::json!({"prefix": prefix, "upstreams": asns}));
            }
        }
        OutputFormat::Psv => {
            println!("prefix|upstreams");
            for r in rows {
                println!("{}|{}", r.prefix, r.upstreams);
            }
        }
    }
}
