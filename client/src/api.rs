//! [`AuthApi`] of the server.

use std::future::Future;

use common::auth::{AuthResponse, LoginRequest, MeResponse, RegisterRequest};
use derive_more::{Display, Error};
use serde::{de::DeserializeOwned, Deserialize};

use crate::Config;

/// Authentication API of the server.
pub trait AuthApi {
    /// Signs in by the provided credentials.
    fn login(
        &self,
        req: LoginRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// Registers a new user, signing it in.
    fn register(
        &self,
        req: RegisterRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// Signs out the session of the provided `token` (if any).
    fn logout(
        &self,
        token: Option<&str>,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Describes the principal of the provided `token`.
    fn me(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<MeResponse, ApiError>> + Send;
}

/// Error of an [`AuthApi`] call.
#[derive(Debug, Display, Error)]
pub enum ApiError {
    /// Credentials or token were rejected.
    #[display("unauthorized")]
    Unauthorized,

    /// User with such name or email already exists.
    #[display("user already exists")]
    AlreadyExists,

    /// Request was rejected as invalid.
    #[display("invalid request: {_0}")]
    Invalid(#[error(not(source))] String),

    /// Server responded with an unexpected status.
    #[display("unexpected response status: {_0}")]
    Status(#[error(not(source))] u16),

    /// Request failed to be performed.
    #[display("request failed: {_0}")]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

/// [`AuthApi`] over HTTP.
///
/// Keeps the cookies set by the server, so the authentication cookie is sent
/// along with the bearer token.
#[derive(Clone, Debug)]
pub struct Http {
    /// Underlying HTTP client.
    client: reqwest::Client,

    /// Base URL of the server API, without a trailing slash.
    base_url: String,
}

impl Http {
    /// Creates a new [`Http`] API client out of the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the HTTP client fails to be initialized.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder()
                .cookie_store(true)
                .timeout(config.timeout)
                .build()?,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Returns the full URL of the provided API `path`.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl AuthApi for Http {
    async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ApiError> {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&req)
            .send()
            .await?;
        read(resp).await
    }

    async fn register(
        &self,
        req: RegisterRequest,
    ) -> Result<AuthResponse, ApiError> {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&req)
            .send()
            .await?;
        read(resp).await
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), ApiError> {
        let mut req = self.client.post(self.url("/api/auth/logout"));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        check(resp).await.map(drop)
    }

    async fn me(&self, token: &str) -> Result<MeResponse, ApiError> {
        let resp = self
            .client
            .get(self.url("/api/auth/me"))
            .bearer_auth(token)
            .send()
            .await?;
        read(resp).await
    }
}

/// Reads the JSON body of the provided successful [`reqwest::Response`].
async fn read<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ApiError> {
    Ok(check(resp).await?.json().await?)
}

/// Checks the status of the provided [`reqwest::Response`], converting
/// unsuccessful ones into an [`ApiError`].
async fn check(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    /// Body of an error response.
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    Err(match status {
        reqwest::StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        reqwest::StatusCode::CONFLICT => ApiError::AlreadyExists,
        reqwest::StatusCode::BAD_REQUEST
        | reqwest::StatusCode::UNPROCESSABLE_ENTITY => ApiError::Invalid(
            resp.json::<ErrorBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_default(),
        ),
        _ => ApiError::Status(status.as_u16()),
    })
}
