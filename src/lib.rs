#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Ripecheck - routing registry checks on top of the RIPEstat Data API
//!
//! Ripecheck fetches announced prefixes, RPKI validation, BGP/registry
//! consistency and WHOIS data for an ASN, IP address or prefix. It can be used
//! as both a command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `display` | Table formatting with `tabled` | `tabled`, `json_to_table` |
//! | `cli` | Full CLI binary | All above + `clap`, `indicatif` |
//!
//! ```toml
//! # Library only, JSON output
//! ripecheck = { version = "0.1", default-features = false }
//!
//! # Default (CLI binary)
//! ripecheck = "0.1"
//! ```
//!
//! # Architecture
//!
//! - **[`lens`]**: High-level business logic
//!   - `ripestat`: data call URLs, response classification, payload decoding,
//!     the per-check result context and ASN resolution
//!   - `utils`: output formats and serde helpers
//!
//! - **[`config`]**: Configuration management
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ripecheck::lens::ripestat::{check_rows, format_rows, CheckArgs, RipestatLens};
//! use ripecheck::OutputFormat;
//!
//! let lens = RipestatLens::new();
//! let ctx = lens.check(&CheckArgs::new("AS3333").with_overview(true))?;
//!
//! for error in ctx.errors() {
//!     eprintln!("{} {}: {}", error.call_type, error.key, error.record.error);
//! }
//! println!("{}", format_rows(&check_rows(&ctx), OutputFormat::Table));
//! ```
//!
//! ## Single data calls
//!
//! ```rust,ignore
//! use ripecheck::lens::ripestat::{decode, CallDescriptor, Endpoint, RipestatLens};
//!
//! let lens = RipestatLens::new();
//! let call = CallDescriptor::new(Endpoint::RpkiValidation)
//!     .param("resource", "3333")
//!     .param("prefix", "193.0.0.0/21");
//! let record = decode(&call.endpoint, lens.fetch(&call));
//! println!("{}", serde_json::to_string_pretty(&record)?);
//! ```

pub mod config;
pub mod lens;

// =============================================================================
// Configuration
// =============================================================================

pub use config::RipecheckConfig;

// =============================================================================
// Lens Module
// =============================================================================

pub use lens::ripestat::{
    CheckArgs, CheckProgress, CheckProgressCallback, ResolveError, ResourceContext, RipestatLens,
};
pub use lens::utils::OutputFormat;
