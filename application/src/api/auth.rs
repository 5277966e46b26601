//! Authentication endpoints.

use axum::Json;
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use common::{
    auth::{AuthResponse, LoginRequest, MeResponse, RegisterRequest},
    Role,
};
use secrecy::SecretBox;
use service::{
    command::{self, create_user, create_user_session, Command as _},
    domain::user::{self, Principal},
};

use crate::{define_error, AsError, AuthError, Context, Error};

/// Registers a new user, signing it in right away.
///
/// # Errors
///
/// If the credentials are malformed, or the name or email is already taken.
#[tracing::instrument(skip_all, fields(username = %req.username))]
pub async fn register(
    ctx: Context,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, Error>,
) -> Result<(CookieJar, Json<AuthResponse>), Error> {
    let RegisterRequest {
        username,
        email,
        password,
    } = req;

    let name = user::Name::new(username).ok_or(CredentialsError::Format)?;
    let email = user::Email::new(email).ok_or(CredentialsError::Format)?;
    let password =
        user::Password::new(password).ok_or(CredentialsError::Format)?;

    let user = ctx
        .service()
        .execute(command::CreateUser {
            name,
            email,
            password: SecretBox::new(Box::new(password)),
            roles: Role::Member.into(),
        })
        .await
        .map_err(AsError::into_error)?;

    let out = ctx
        .service()
        .execute(command::CreateUserSession::ByUserId(user.id))
        .await
        .map_err(AsError::into_error)?;

    Ok(respond(&ctx, jar, out))
}

/// Signs in an existing user by its credentials.
///
/// # Errors
///
/// If the credentials don't match any user.
#[tracing::instrument(skip_all)]
pub async fn login(
    ctx: Context,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, Error>,
) -> Result<(CookieJar, Json<AuthResponse>), Error> {
    let LoginRequest {
        username_or_email,
        password,
    } = req;

    // Malformed identifiers can't match anyone, so they are told apart from
    // wrong credentials no more than missing users are.
    let identifier = user::Identifier::new(username_or_email)
        .ok_or(AuthError::Unauthorized)?;

    let out = ctx
        .service()
        .execute(command::CreateUserSession::ByCredentials {
            identifier,
            password: SecretBox::new(Box::new(user::Password::unchecked(
                password,
            ))),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(respond(&ctx, jar, out))
}

/// Signs out, removing the authentication cookie.
///
/// Always succeeds, as there is nothing to revoke on the server.
#[expect(clippy::unused_async, reason = "`async` is required by `axum`")]
pub async fn logout(ctx: Context, jar: CookieJar) -> CookieJar {
    ctx.transport().clear(jar)
}

/// Describes the authenticated user.
///
/// # Errors
///
/// If the request is not authenticated.
pub async fn me(ctx: Context) -> Result<Json<MeResponse>, Error> {
    Ok(Json(me_response(ctx.principal().await?)))
}

/// Builds the successful [`AuthResponse`] out of the created session,
/// attaching its token to the [`CookieJar`].
fn respond(
    ctx: &Context,
    jar: CookieJar,
    out: create_user_session::Output,
) -> (CookieJar, Json<AuthResponse>) {
    let create_user_session::Output {
        token,
        token_id: _,
        principal,
        expires_at,
    } = out;

    tracing::info!(user = %principal.id, "signed in");

    let jar = ctx.transport().attach(jar, &token, expires_at);
    let resp = AuthResponse {
        token: token.to_string(),
        token_type: "Bearer".to_owned(),
        expires_at: expires_at.coerce(),
        user: me_response(&principal),
    };
    (jar, Json(resp))
}

/// Describes the provided [`Principal`] for the API.
fn me_response(principal: &Principal) -> MeResponse {
    MeResponse {
        id: principal.id.into(),
        username: principal.name.to_string(),
        email: principal.email.to_string(),
        roles: principal.roles,
    }
}

impl AsError for create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlreadyExists => Some(CredentialsError::Occupied.into()),
            Self::PasswordHash(_) => None,
        }
    }
}

impl AsError for create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::WrongCredentials => Some(AuthError::Unauthorized.into()),
            Self::JsonWebTokenEncodeError(_) | Self::UserNotExists(_) => None,
        }
    }
}

define_error! {
    enum CredentialsError {
        #[code = "INVALID_CREDENTIALS_FORMAT"]
        #[status = BAD_REQUEST]
        #[message = "Username, email or password has invalid format"]
        Format,

        #[code = "ALREADY_EXISTS"]
        #[status = CONFLICT]
        #[message = "User with such username or email already exists"]
        Occupied,
    }
}
