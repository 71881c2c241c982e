//! RIPEstat lens module
//!
//! This module issues RIPEstat Data API calls, classifies the responses,
//! decodes the payloads of the supported data calls and collects the results
//! of a resource check into a [`ResourceContext`].
//!
//! # Check workflow
//!
//! A check resolves the resource to an ASN and then runs, in order:
//! `announced-prefixes`, one `rpki-validation` per announced prefix,
//! `as-routing-consistency` and `whois`. `as-overview` and `ris-prefixes` are
//! optional. A failed call is stored as an error record and the workflow
//! carries on; only a failed resolution aborts the check.
//!
//! ```rust,ignore
//! use ripecheck::lens::ripestat::{CheckArgs, RipestatLens};
//!
//! let lens = RipestatLens::new();
//! let ctx = lens.check(&CheckArgs::new("AS3333"))?;
//!
//! for prefix in ctx.prefixes(&ctx.asn) {
//!     println!("{} roa-valid={}", prefix, ctx.is_roa_valid(&ctx.asn, &prefix));
//! }
//! ```
//!
//! # Progress Tracking
//!
//! ```rust,ignore
//! use ripecheck::lens::ripestat::{CheckArgs, CheckProgress, RipestatLens};
//! use std::sync::Arc;
//!
//! let callback = Arc::new(|progress: CheckProgress| {
//!     if let CheckProgress::CallFinished { call_type, resource, .. } = progress {
//!         println!("{} {} done", call_type, resource);
//!     }
//! });
//! let ctx = RipestatLens::new().check_with_progress(&CheckArgs::new("AS3333"), Some(callback))?;
//! ```

pub mod context;
pub mod decode;
pub mod endpoint;
pub mod report;
pub mod resolve;
pub mod response;
pub mod status;
pub mod transport;

pub use context::{CallType, ResourceContext, ResourceKey, SlotError};
pub use decode::{decode, DecodedRecord, ErrorRecord, ErrorSource};
pub use endpoint::{
    build_url, build_url_with_base, methodology_url, CallDescriptor, Endpoint, RIPESTAT_BASE_URL,
};
pub use report::{check_rows, format_rows, CheckRow};
pub use resolve::{parse_asn, resolve, AsnParseFailure, ResolveError};
pub use response::{parse_body, parse_response, CallMeta, CallOutcome};
pub use status::StatusTag;
pub use transport::{
    HttpGet, HttpResponse, RequestOptions, TransportFailure, UreqTransport, DEFAULT_TIMEOUT,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Progress Tracking Types
// =============================================================================

/// Progress information for a check
#[derive(Debug, Clone, Serialize)]
pub enum CheckProgress {
    /// The resource resolved to an ASN
    Started { resource: String, asn: String },
    /// Announced prefixes are known, so is the number of calls
    Planned { total_calls: usize },
    /// One data call finished and was stored
    CallFinished {
        call_type: CallType,
        resource: String,
        success: bool,
    },
    /// All calls have been issued
    Completed { total_calls: usize, errors: usize },
}

/// Type alias for progress callback function
pub type CheckProgressCallback = Arc<dyn Fn(CheckProgress) + Send + Sync>;

fn notify(callback: &Option<CheckProgressCallback>, progress: CheckProgress) {
    if let Some(ref cb) = callback {
        cb(progress);
    }
}

// =============================================================================
// Args
// =============================================================================

/// Arguments for a resource check
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct CheckArgs {
    /// ASN (`AS3333`, `3333`), IP address or prefix to check
    #[cfg_attr(feature = "cli", clap(value_name = "RESOURCE"))]
    pub resource: String,

    /// Also fetch the as-overview data call
    #[cfg_attr(feature = "cli", clap(long = "overview"))]
    #[serde(default)]
    pub with_overview: bool,

    /// Also fetch the prefixes RIS sees the ASN originate and transit
    #[cfg_attr(feature = "cli", clap(long = "ris"))]
    #[serde(default)]
    pub with_ris: bool,
}

impl CheckArgs {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }

    pub fn with_overview(mut self, with_overview: bool) -> Self {
        self.with_overview = with_overview;
        self
    }

    pub fn with_ris(mut self, with_ris: bool) -> Self {
        self.with_ris = with_ris;
        self
    }
}

// =============================================================================
// Lens
// =============================================================================

/// RIPEstat Data API lens
///
/// Each call method takes the context by value, stores the decoded result of
/// one data call in it and hands it back.
pub struct RipestatLens<T: HttpGet = UreqTransport> {
    transport: T,
    options: RequestOptions,
    base_url: String,
}

impl RipestatLens<UreqTransport> {
    /// Create a lens talking to the public RIPEstat service
    pub fn new() -> Self {
        Self::with_transport(UreqTransport::new())
    }
}

impl Default for RipestatLens<UreqTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HttpGet> RipestatLens<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            options: RequestOptions::default(),
            base_url: RIPESTAT_BASE_URL.to_string(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Point the lens at a RIPEstat mirror
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one data call and classify its response
    pub fn fetch(&self, call: &CallDescriptor) -> CallOutcome {
        let url = call.url(&self.base_url);
        debug!("GET {}", url);
        parse_response(&url, self.transport.get(&url, &self.options))
    }

    /// Fetch `call`, decode it and store the record under `call_type`/`key`
    fn call(
        &self,
        ctx: ResourceContext,
        call_type: CallType,
        key: ResourceKey,
        call: CallDescriptor,
    ) -> ResourceContext {
        let record = decode(&call.endpoint, self.fetch(&call));
        if let Some(error) = record.as_error() {
            warn!("{} call for {} failed: {}", call_type, key, error.error);
        }
        ctx.store(call_type, key, record)
    }

    fn asn_call(&self, ctx: ResourceContext, call_type: CallType, asn: &str) -> ResourceContext {
        let call = CallDescriptor::new(call_type.endpoint()).param("resource", asn);
        self.call(ctx, call_type, asn.into(), call)
    }

    /// Prefixes announced by `asn`
    pub fn announced(&self, ctx: ResourceContext, asn: &str) -> ResourceContext {
        self.asn_call(ctx, CallType::Announced, asn)
    }

    pub fn as_overview(&self, ctx: ResourceContext, asn: &str) -> ResourceContext {
        self.asn_call(ctx, CallType::AsOverview, asn)
    }

    /// BGP versus routing registry consistency for `asn`
    pub fn consistency(&self, ctx: ResourceContext, asn: &str) -> ResourceContext {
        self.asn_call(ctx, CallType::Consistency, asn)
    }

    pub fn whois(&self, ctx: ResourceContext, asn: &str) -> ResourceContext {
        self.asn_call(ctx, CallType::Whois, asn)
    }

    /// Origin of an IP address or prefix
    pub fn network(&self, ctx: ResourceContext, resource: &str) -> ResourceContext {
        let call = CallDescriptor::new(Endpoint::NetworkInfo).param("resource", resource);
        self.call(ctx, CallType::Network, resource.into(), call)
    }

    /// RPKI validation of the route `asn`/`prefix`
    pub fn roa(&self, ctx: ResourceContext, asn: &str, prefix: &str) -> ResourceContext {
        let call = CallDescriptor::new(Endpoint::RpkiValidation)
            .param("resource", asn)
            .param("prefix", prefix);
        self.call(ctx, CallType::Roa, ResourceKey::pair(asn, prefix), call)
    }

    /// Upstream ASNs per prefix of `resource`
    pub fn bgp_state(&self, ctx: ResourceContext, resource: &str) -> ResourceContext {
        let call = CallDescriptor::new(Endpoint::BgpState).param("resource", resource);
        self.call(ctx, CallType::BgpState, resource.into(), call)
    }

    pub fn ris_prefixes(&self, ctx: ResourceContext, asn: &str) -> ResourceContext {
        let call = CallDescriptor::new(Endpoint::RisPrefixes)
            .param("resource", asn)
            .param("list_prefixes", "true");
        self.call(ctx, CallType::RisPrefixes, asn.into(), call)
    }

    pub fn resolve_asn(&self, token: &str) -> Result<String, ResolveError> {
        resolve(self, token)
    }

    /// Run the full check for `args.resource`
    pub fn check(&self, args: &CheckArgs) -> Result<ResourceContext> {
        self.check_with_progress(args, None)
    }

    /// Run the full check, reporting every finished call to `callback`
    pub fn check_with_progress(
        &self,
        args: &CheckArgs,
        callback: Option<CheckProgressCallback>,
    ) -> Result<ResourceContext> {
        let asn = self.resolve_asn(&args.resource)?;
        info!("checking {} as AS{}", args.resource, asn);
        notify(
            &callback,
            CheckProgress::Started {
                resource: args.resource.clone(),
                asn: asn.clone(),
            },
        );

        let finished = |ctx: &ResourceContext, call_type: CallType, key: ResourceKey| {
            let success = ctx.get(call_type, &key).is_some_and(|r| !r.is_error());
            notify(
                &callback,
                CheckProgress::CallFinished {
                    call_type,
                    resource: key.to_string(),
                    success,
                },
            );
        };

        let mut ctx = ResourceContext::new(asn.as_str())
            .with_opt("resource", args.resource.as_str())
            .with_opt(
                "timeout",
                humantime::format_duration(self.options.timeout).to_string(),
            )
            .with_opt("max_retries", self.options.max_retries.to_string());
        if args.with_overview {
            ctx = ctx.with_opt("overview", "true");
        }
        if args.with_ris {
            ctx = ctx.with_opt("ris", "true");
        }

        ctx = self.announced(ctx, &asn);
        finished(&ctx, CallType::Announced, asn.as_str().into());

        let prefixes = match ctx.get(CallType::Announced, &asn.as_str().into()) {
            Some(DecodedRecord::Announced(announced)) => announced.prefixes.clone(),
            _ => vec![],
        };
        info!("AS{} announces {} prefixes", asn, prefixes.len());

        let total_calls = 3
            + prefixes.len()
            + usize::from(args.with_overview)
            + usize::from(args.with_ris);
        notify(&callback, CheckProgress::Planned { total_calls });

        for prefix in &prefixes {
            ctx = self.roa(ctx, &asn, prefix);
            finished(&ctx, CallType::Roa, ResourceKey::pair(asn.as_str(), prefix.as_str()));
        }

        ctx = self.consistency(ctx, &asn);
        finished(&ctx, CallType::Consistency, asn.as_str().into());

        ctx = self.whois(ctx, &asn);
        finished(&ctx, CallType::Whois, asn.as_str().into());

        if args.with_overview {
            ctx = self.as_overview(ctx, &asn);
            finished(&ctx, CallType::AsOverview, asn.as_str().into());
        }
        if args.with_ris {
            ctx = self.ris_prefixes(ctx, &asn);
            finished(&ctx, CallType::RisPrefixes, asn.as_str().into());
        }

        let errors = ctx.errors().len();
        info!(
            "check of AS{} finished: {} calls, {} errors",
            asn, total_calls, errors
        );
        notify(
            &callback,
            CheckProgress::Completed {
                total_calls,
                errors,
            },
        );

        Ok(ctx)
    }
}
