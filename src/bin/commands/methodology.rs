use clap::Args;
use ripecheck::lens::ripestat::Endpoint;

/// Arguments for the Methodology command
#[derive(Args)]
pub struct MethodologyArgs {
    /// Data call to show the documentation for
    #[clap(value_enum)]
    pub endpoint: Endpoint,
}

pub fn run(args: MethodologyArgs) {
    println!("{}", args.endpoint.methodology_url());
}
