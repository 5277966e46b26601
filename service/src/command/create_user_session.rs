//! [`Command`] for creating a [`Session`].

use common::{
    operations::{By, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{session::Token, Identifier, Password};
use crate::{
    domain::{
        user::{self, session, Principal, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`].
#[derive(Clone, Debug, From)]
pub enum CreateUserSession {
    /// Create a new [`Session`] by [`User`] credentials.
    ByCredentials {
        /// [`Identifier`] of a [`User`].
        identifier: user::Identifier,

        /// [`Password`] of a [`User`].
        password: SecretBox<user::Password>,
    },

    /// Create a new [`Session`] by [`User`] ID.
    ByUserId(user::Id),
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Token`] of the created [`Session`].
    pub token: session::Token,

    /// ID of the issued [`Token`].
    pub token_id: session::TokenId,

    /// [`Principal`] the [`Session`] has been created for.
    pub principal: Principal,

    /// [`DateTime`] when the [`Session`] expires.
    pub expires_at: session::ExpirationDateTime,
}

impl<Db> Command<CreateUserSession> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Identifier>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use CreateUserSession as Cmd;
        use ExecutionError as E;

        let user = match cmd {
            Cmd::ByCredentials {
                identifier,
                password,
            } => {
                let password = password.expose_secret();
                match self
                    .database()
                    .execute(Select(By::new(&identifier)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                {
                    Some(user) if user.password_hash.verify(password) => user,
                    Some(_) => return Err(tracerr::new!(E::WrongCredentials)),
                    None => {
                        user::PasswordHash::verify_nothing(password);
                        return Err(tracerr::new!(E::WrongCredentials));
                    }
                }
            }
            Cmd::ByUserId(user_id) => self
                .database()
                .execute(Select(By::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or_else(|| E::UserNotExists(user_id))
                .map_err(tracerr::wrap!())?,
        };

        let principal = Principal::from(user);
        let session::Issued {
            token,
            token_id,
            expires_at,
        } = self
            .config
            .codec
            .issue(&principal, DateTime::now(), self.config.session_ttl)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tracing::debug!(
            user = %principal.id,
            token = %token_id,
            "`Session` created",
        );

        Ok(Output {
            token,
            token_id,
            principal,
            expires_at,
        })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`CreateUserSession::ByCredentials`] contains wrong credentials.
    #[display("Wrong `User` credentials")]
    WrongCredentials,
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Role};
    use secrecy::SecretBox;

    use crate::{
        command::{AuthorizeUserSession, Command as _, CreateUser},
        domain::{user, User},
        test_service,
        TestService,
    };

    use super::{CreateUserSession, ExecutionError};

    fn password(s: &str) -> SecretBox<user::Password> {
        SecretBox::new(Box::new(user::Password::unchecked(s)))
    }

    async fn alice(svc: &TestService) -> User {
        svc.execute(CreateUser {
            name: user::Name::new("alice").unwrap(),
            email: user::Email::new("alice@x.com").unwrap(),
            password: password("secret1"),
            roles: Role::Member | Role::Moderator,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn logs_in_by_name_or_email() {
        let svc = test_service();
        let alice = alice(&svc).await;

        for identifier in ["alice", "alice@x.com", "ALICE@x.com"] {
            let out = svc
                .execute(CreateUserSession::ByCredentials {
                    identifier: user::Identifier::new(identifier).unwrap(),
                    password: password("secret1"),
                })
                .await
                .unwrap();

            assert_eq!(out.principal.id, alice.id, "identifier: {identifier}");
            assert_eq!(out.principal.roles, Role::Member | Role::Moderator);
            assert!(out.expires_at > DateTime::now().coerce());
        }
    }

    #[tokio::test]
    async fn does_not_tell_missing_user_from_wrong_password() {
        let svc = test_service();
        drop(alice(&svc).await);

        for (identifier, pass) in
            [("alice", "secret2"), ("bob", "secret1")]
        {
            let err = svc
                .execute(CreateUserSession::ByCredentials {
                    identifier: user::Identifier::new(identifier).unwrap(),
                    password: password(pass),
                })
                .await
                .unwrap_err();

            assert!(
                matches!(err.as_ref(), ExecutionError::WrongCredentials),
                "identifier: {identifier}, password: {pass}",
            );
        }
    }

    #[tokio::test]
    async fn issues_token_authorizing_same_principal() {
        let svc = test_service();
        let alice = alice(&svc).await;

        let out = svc
            .execute(CreateUserSession::ByUserId(alice.id))
            .await
            .unwrap();
        let session = svc
            .execute(AuthorizeUserSession { token: out.token })
            .await
            .unwrap();

        assert_eq!(session.principal, out.principal);
        assert_eq!(session.token_id, out.token_id);
        assert_eq!(session.expires_at, out.expires_at);
    }

    #[tokio::test]
    async fn fails_for_unknown_user_id() {
        let svc = test_service();

        let err = svc
            .execute(CreateUserSession::ByUserId(7.into()))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::UserNotExists(id) if i64::from(*id) == 7,
        ));
    }
}
