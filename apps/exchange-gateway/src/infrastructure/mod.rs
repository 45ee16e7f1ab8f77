//! Infrastructure Layer
//!
//! Transport plumbing that per-exchange clients build on.

pub mod http;
