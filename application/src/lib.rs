//! Application provides API for interacting with the [`Service`].

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod config;
mod context;
pub mod error;
pub mod transport;

use axum::{Extension, Router};
// Used in binary.
use axum_client_ip as _;
use tower_http as _;
use tracing_subscriber as _;
#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use tower as _;

pub use self::{
    args::Args,
    config::Config,
    context::{AuthError, Context},
    error::{AsError, Error},
    transport::Transport,
};

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
pub type Service = service::Service<service::infra::Memory>;

/// Builds the application [`Router`] serving the HTTP API with the provided
/// [`Service`] and [`Transport`].
pub fn app(service: Service, transport: Transport) -> Router {
    api::router()
        .layer(Extension(service))
        .layer(Extension(transport))
}
