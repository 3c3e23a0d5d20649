//! Buildwright remote build service
//!
//! Accepts build requests over a plain TCP socket, ingests the task payload
//! each carries, builds the named task under a randomized name and replies
//! with that name.
//!
//! # Example
//!
//! ```rust
//! use bw_server::{WireRequest, WireResponse};
//!
//! let request = WireRequest::decode(b"close").unwrap();
//! assert_eq!(request, WireRequest::Close);
//! assert_eq!(WireResponse::CompileFailed.encode(), b"Compile failed");
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod service;

pub use config::{BuildScope, ServiceConfig, DEFAULT_BUFFER_SIZE, DEFAULT_PORT};
pub use error::{MalformedRequestError, ServiceError};
pub use protocol::{WireRequest, WireResponse, CLOSE_SENTINEL};
pub use service::{
    randomized_name, Acceptor, ConnectionEnd, RemoteBuildService, ServiceState, TcpAcceptor, SUFFIX_LEN,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running the service
    pub use crate::{RemoteBuildService, ServiceConfig, ServiceError, TcpAcceptor, WireRequest, WireResponse};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
