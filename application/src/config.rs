//! [`Config`]-related definitions.

use std::time;

use common::{Role, RoleSet};
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{de::Error as _, Deserialize, Deserializer};
use service::domain::user::session;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Authentication configuration.
    pub auth: Auth,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    ///
    /// Must be listed explicitly, as credentialed requests forbid wildcards.
    pub origins: Vec<String>,
}

/// Authentication configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Auth {
    /// Secret key tokens are signed with.
    ///
    /// Must be set, as the server refuses to start with an empty one.
    #[default(SecretString::from(String::new()))]
    #[serde(deserialize_with = "secret")]
    pub secret: SecretString,

    /// Issuer of the tokens.
    #[default("site".to_owned())]
    pub issuer: String,

    /// Audience of the tokens.
    #[default("site-clients".to_owned())]
    pub audience: String,

    /// Lifetime of the issued tokens.
    #[default(time::Duration::from_secs(7 * 24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub token_ttl: time::Duration,

    /// Tolerated clock skew between the token issuer and verifier.
    #[default(time::Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub leeway: time::Duration,

    /// Cookie configuration.
    pub cookie: Cookie,

    /// Administrator to create on startup (if any).
    pub admin: Option<Admin>,
}

impl TryFrom<&Auth> for service::Config {
    type Error = session::ConfigError;

    fn try_from(auth: &Auth) -> Result<Self, Self::Error> {
        Ok(Self {
            codec: session::Codec::new(
                auth.secret.expose_secret().as_bytes(),
                auth.issuer.clone(),
                auth.audience.clone(),
                auth.leeway,
            )?,
            session_ttl: auth.token_ttl,
        })
    }
}

/// Authentication cookie configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cookie {
    /// Name of the cookie.
    #[default("auth_token".to_owned())]
    pub name: String,

    /// Indicator whether the cookie is sent over HTTPS only.
    ///
    /// Disable for local development over plain HTTP only.
    #[default(true)]
    pub secure: bool,
}

/// Administrator account configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Admin {
    /// Name of the administrator.
    pub username: String,

    /// Email of the administrator.
    pub email: String,

    /// Password of the administrator.
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,

    /// Roles granted to the administrator, like `Admin,Moderator`.
    #[serde(default = "admin_roles", deserialize_with = "role_set")]
    pub roles: RoleSet,
}

/// Default [`Admin::roles`].
fn admin_roles() -> RoleSet {
    Role::Admin.into()
}

/// Deserializes a [`SecretString`] out of a plain string.
fn secret<'de, D: Deserializer<'de>>(d: D) -> Result<SecretString, D::Error> {
    String::deserialize(d).map(Into::into)
}

/// Deserializes a [`RoleSet`] out of comma-separated [`Role`] names.
fn role_set<'de, D: Deserializer<'de>>(d: D) -> Result<RoleSet, D::Error> {
    String::deserialize(d)?.parse().map_err(D::Error::custom)
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::Role;
    use secrecy::ExposeSecret as _;

    use super::{Config, LogLevel};

    #[test]
    fn defaults_without_file() {
        let config = Config::new("nonexistent.toml").unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.server.cors.origins.is_empty());
        assert_eq!(config.auth.secret.expose_secret(), "");
        assert_eq!(config.auth.issuer, "site");
        assert_eq!(config.auth.cookie.name, "auth_token");
        assert!(config.auth.cookie.secure);
        assert_eq!(
            config.auth.token_ttl,
            Duration::from_secs(7 * 24 * 60 * 60),
        );
        assert_eq!(config.auth.leeway, Duration::from_secs(60));
        assert!(config.auth.admin.is_none());
        assert!(matches!(config.log.level, LogLevel::Info));
    }

    #[test]
    fn refuses_empty_secret() {
        let config = Config::default();

        assert!(service::Config::try_from(&config.auth).is_err());
    }

    #[test]
    fn parses_admin_section() {
        let admin: super::Admin = serde_json::from_value(serde_json::json!({
            "username": "root",
            "email": "root@x.com",
            "password": "secret1",
            "roles": "Admin,Moderator",
        }))
        .unwrap();

        assert_eq!(admin.roles, Role::Admin | Role::Moderator);
        assert_eq!(admin.password.expose_secret(), "secret1");
    }
}
