//! [`Context`]-related definitions.

use axum::{async_trait, extract::FromRequestParts};
use common::RoleSet;
use service::{
    command::{self, Command as _},
    domain::user::{session, Principal, Session},
};
use tokio::sync::OnceCell;

use crate::{define_error, Error, Service, Transport};

/// Application context of a single HTTP request.
///
/// Authenticates the request lazily: the [`session::Token`] is verified on
/// the first demand only, and the verdict is reused afterwards.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// [`Transport`] the [`session::Token`] has been extracted with.
    transport: Transport,

    /// [`session::Token`] provided with the request (if any).
    token: Option<session::Token>,

    /// Verified [`Session`] of the request, if it's authenticated.
    session: OnceCell<Option<Session>>,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns [`Transport`] of this [`Context`].
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Returns the current [`Session`] of this [`Context`], if the request
    /// is authenticated.
    ///
    /// Rejected [`session::Token`]s leave the request anonymous, with the
    /// rejection reason logged only.
    pub async fn current_session(&self) -> Option<&Session> {
        self.session
            .get_or_init(|| async {
                let token = self.token.clone()?;
                self.service
                    .execute(command::AuthorizeUserSession { token })
                    .await
                    .map_err(|e| {
                        tracing::debug!("token rejected: {}", e.as_ref());
                    })
                    .ok()
            })
            .await
            .as_ref()
    }

    /// Returns the authenticated [`Principal`] of this [`Context`], if any.
    pub async fn current_principal(&self) -> Option<&Principal> {
        self.current_session().await.map(|s| &s.principal)
    }

    /// Indicates whether the authenticated [`Principal`] has at least one of
    /// the `required` roles.
    ///
    /// Anonymous requests have no roles at all.
    pub async fn has_any_role(&self, required: RoleSet) -> bool {
        self.current_principal()
            .await
            .is_some_and(|p| p.has_any_role(required))
    }

    /// Returns the authenticated [`Principal`] of this [`Context`].
    ///
    /// # Errors
    ///
    /// If the request is not authenticated.
    pub async fn principal(&self) -> Result<&Principal, Error> {
        self.current_principal()
            .await
            .ok_or_else(|| AuthError::Unauthorized.into())
    }

    /// Returns the authenticated [`Principal`] of this [`Context`], if it
    /// has at least one of the `required` roles.
    ///
    /// # Errors
    ///
    /// If the request is not authenticated, or lacks the `required` roles.
    pub async fn require_any_role(
        &self,
        required: RoleSet,
    ) -> Result<&Principal, Error> {
        let principal = self.principal().await?;
        if !principal.has_any_role(required) {
            tracing::debug!(
                user = %principal.id,
                roles = %principal.roles,
                required = %required,
                "access forbidden",
            );
            return Err(AuthError::Forbidden.into());
        }
        Ok(principal)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;
        let transport = parts
            .extensions
            .get::<Transport>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Transport` extension"))?;

        Ok(Self {
            token: transport.extract(&parts.headers),
            service,
            transport,
            session: OnceCell::new(),
        })
    }
}

define_error! {
    enum AuthError {
        #[code = "UNAUTHORIZED"]
        #[status = UNAUTHORIZED]
        #[message = "Authentication required"]
        Unauthorized,

        #[code = "FORBIDDEN"]
        #[status = FORBIDDEN]
        #[message = "Not enough privileges"]
        Forbidden,
    }
}
