//! # mesh-identity
//!
//! A tower layer for axum services that works out who is making each request
//! and keeps that identity, along with a few correlation attributes, in the
//! logging context for as long as the request is being handled.
//!
//! Every service in the mesh installs the same layer, so every log line and
//! every outbound call carries the same user, accounts and request id without
//! the business logic having to pass them around.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use mesh_identity::{Config, IdentityLayer, context};
//!
//! async fn hello() -> String {
//!     tracing::info!("saying hello");
//!     format!("Hello, {}!", context::current_user().unwrap_or_default())
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = Config::default();  // Loads from config/{RUST_ENV}.toml
//!     config.setup_tracing();
//!
//!     let app = Router::new()
//!         .route("/", get(hello))
//!         .layer(IdentityLayer::from_config(&config));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await
//! }
//! ```
//!
//! With `config/dev.toml`:
//! ```toml
//! [identity]
//! extract_headers = true
//! extract_origin_header = true
//! force_new_request_id = false
//!
//! [logging]
//! format = "json"
//! ```
//!
//! # Identity Resolution
//!
//! | Priority | Source | Condition |
//! |----------|--------|-----------|
//! | 1 | Session, then ambient, security context | Always |
//! | 2 | `x-spinnaker-user` / `x-spinnaker-accounts` headers | `extract_headers` |
//! | 3 | rfc822Name of the verified client certificates (user only) | Secure transport, no user yet |
//!
//! Header extraction trusts the caller completely. Only enable it behind a
//! gateway that strips these headers from requests entering the mesh.
//!
//! # Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | Reading the propagation context from inside a request |
//! | [`headers`] | Reserved header and attribute names |
//! | [`Config`] | Configuration loading and tracing setup |
//! | [`IdentityLayer`] | The tower layer |
//! | [`Error`] | Error types and handling |
mod attributes;
mod augment;
mod config;
mod error;
mod identity;
mod layer;
mod propagator;
mod utils;

pub mod context;
pub mod headers;

pub use attributes::*;
pub use augment::*;
pub use config::*;
pub use error::*;
pub use identity::*;
pub use layer::*;
pub use propagator::*;
pub use utils::*;

pub type Result<T> = std::result::Result<T, Error>;
