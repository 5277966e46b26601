//! [`Command`] for authorizing a [`Session`].

use common::DateTime;
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::session::Codec;
use crate::{
    domain::user::{session, Session},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`Session`] out of its [`session::Token`].
///
/// Nothing is looked up: the [`session::Token`] alone is trusted once its
/// signature and validity bounds are verified.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        let AuthorizeUserSession { token } = cmd;

        self.config
            .codec
            .verify(&token, DateTime::now())
            .map_err(tracerr::from_and_wrap!(=> ExecutionError))
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Clone, Copy, Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`session::Token`] was rejected by the [`Codec`].
    #[display("`Session` token rejected: {_0}")]
    Rejected(session::Rejection),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::Command as _, domain::user::session, test_service,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    #[tokio::test]
    async fn rejects_garbage_token() {
        let svc = test_service();

        let err = svc
            .execute(AuthorizeUserSession::from(session::Token::from(
                "not.a.token",
            )))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Rejected(session::Rejection::Malformed),
        ));
    }
}
