pub mod gemini;
pub mod upstream;

pub use upstream::{TransportError, Upstream, UpstreamResponse};
