pub mod check;
pub mod methodology;
pub mod query;
pub mod resolve;
pub mod upstreams;
