//! Lens module
//!
//! This module provides high-level "lens" abstractions that combine business logic
//! with output formatting. Lenses are designed to be reusable across different
//! interfaces (CLI, scripts, other services).
//!
//! # Architecture
//!
//! Each lens module exports:
//! - A **Lens struct** (e.g., `RipestatLens`) - the main entry point for all operations
//! - **Args structs** - input arguments for lens methods
//! - **Output types** - return types and format enums
//!
//! # Usage
//!
//! ```rust,ignore
//! use ripecheck::lens::ripestat::{RipestatLens, CheckArgs, ResourceContext};
//! use ripecheck::lens::utils::OutputFormat;
//! ```

// =============================================================================
// Utility module
// =============================================================================
pub mod utils;

// RipestatLens - RIPEstat Data API calls and resource checks
pub mod ripestat;
