//! [`Config`]-related definitions.

use std::{path::PathBuf, time::Duration};

use smart_default::SmartDefault;

/// [`ClientSession`] configuration.
///
/// [`ClientSession`]: crate::ClientSession
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Base URL of the server API.
    #[default("http://localhost:8080".to_owned())]
    pub base_url: String,

    /// Route to navigate to once signed out.
    #[default("/".to_owned())]
    pub default_route: String,

    /// Path of the file the last issued token is persisted in.
    #[default(PathBuf::from("auth_token"))]
    pub storage_path: PathBuf,

    /// Timeout of a single request to the server.
    #[default(Duration::from_secs(30))]
    pub timeout: Duration,
}
