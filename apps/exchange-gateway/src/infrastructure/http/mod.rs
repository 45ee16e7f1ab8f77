//! HTTP plumbing shared by exchange clients.

mod transport;

pub use transport::HttpTransport;
