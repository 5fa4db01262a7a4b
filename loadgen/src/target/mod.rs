//! Target service collaborator
//!
//! This module provides:
//! - `TargetService` trait abstracting the service under test
//! - `HttpTarget` speaking the shop's JSON-over-HTTP API through reqwest
//! - Request/reply types shared by scenarios and the setup provider

mod http;
mod service;
mod types;

pub use http::HttpTarget;
pub use service::TargetService;
pub use types::{AuthResponse, Credentials, Endpoint, ErrorResponse, Reply, TargetError, Transfer};
