//! Client keeping track of the authentication state against the server.
//!
//! The state is reconstructed from the last issued token alone, which is
//! persisted between runs, and every change of it is broadcast to the
//! subscribers.

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
pub mod config;
pub mod observer;
pub mod session;
pub mod state;
pub mod storage;
pub mod token;

#[cfg(test)]
use futures as _;
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio as _;

pub use self::{
    api::{ApiError, AuthApi, Http},
    config::Config,
    observer::Subscription,
    session::ClientSession,
    state::AuthState,
    storage::{FileStorage, MemoryStorage, Storage, StorageError},
};
