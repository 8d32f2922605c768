pub mod transport;
#[cfg(feature = "http-client")]
pub mod http_transport;

pub use transport::{CouchRequest, CouchResponse, CouchTransport, TransportError};
#[cfg(feature = "http-client")]
pub use http_transport::HttpTransport;
