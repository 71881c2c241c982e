use anyhow::{anyhow, Result};
use clap::Args;
use json_to_table::json_to_table;
use ripecheck::lens::ripestat::{decode, CallDescriptor, RipestatLens};
use ripecheck::lens::utils::OutputFormat;
use serde_json::json;

/// Arguments for the Query command
#[derive(Args)]
pub struct QueryArgs {
    /// Data call name, e.g. announced-prefixes
    #[clap(value_name = "ENDPOINT")]
    pub endpoint: String,

    /// Value of the `resource` parameter
    #[clap(value_name = "RESOURCE")]
    pub resource: String,

    /// Value of the `prefix` parameter (rpki-validation)
    #[clap(short, long)]
    pub prefix: Option<String>,

    /// Extra query parameters, e.g. `--param list_prefixes=true`
    #[clap(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

fn parse_param(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", s))?;
    Ok((key.to_string(), value.to_string()))
}

pub fn run(lens: &RipestatLens, args: QueryArgs, output_format: OutputFormat) {
    let mut call = CallDescriptor::named(args.endpoint).param("resource", args.resource);
    if let Some(prefix) = args.prefix {
        call = call.param("prefix", prefix);
    }
    for (key, value) in args.params {
        call = call.param(key, value);
    }

    let record = decode(&call.endpoint, lens.fetch(&call));
    if let Some(e) = record.as_error() {
        eprintln!("ERROR: {}", e.error);
    }

    let json_value = json!(&record);
    match output_format {
        OutputFormat::Table | OutputFormat::Markdown | OutputFormat::Psv => {
            let mut table = json_to_table(&json_value);
            table.collapse();
            println!("{}", table);
        }
        OutputFormat::JsonPretty => {
            if let Err(e) = serde_json::to_writer_pretty(std::io::stdout(), &json_value) {
                eprintln!("Error writing JSON to stdout: {}", e);
            }
            println!();
        }
        OutputFormat::Json | OutputFormat::JsonLine => println!("{}", json_value),
    }
}
