use clap::Args;
use ripecheck::lens::ripestat::RipestatLens;
use ripecheck::lens::utils::OutputFormat;
use serde_json::json;

/// Arguments for the Resolve command
#[derive(Args)]
pub struct ResolveArgs {
    /// ASN, IP address or prefix
    #[clap(value_name = "RESOURCE")]
    pub resource: String,
}

pub fn run(lens: &RipestatLens, args: ResolveArgs, output_format: OutputFormat) {
    let asn = match lens.resolve_asn(&args.resource) {
        Ok(asn) => asn,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return;
        }
    };

    if output_format.is_json() {
        let value = json!({"resource": args.resource, "asn": asn});
        match output_format {
            OutputFormat::JsonPretty => match serde_json::to_string_pretty(&value) {
                Ok(s) => println!("{}", s),
                Err(e) => eprintln!("ERROR: Failed to serialize to JSON: {}", e),
            },
            _ => println!("{}", value),
        }
    } else {
        println!("AS{}", asn);
    }
}
