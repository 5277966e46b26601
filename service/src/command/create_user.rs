//! [`Command`] for creating a new [`User`].

use common::{operations::Insert, DateTime, RoleSet};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Clone, Debug)]
pub struct CreateUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// Roles granted to a new [`User`].
    pub roles: RoleSet,
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: Database<
        Insert<user::New>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            name,
            email,
            password,
            roles,
        } = cmd;

        let password_hash = user::PasswordHash::new(password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let user = self
            .database()
            .execute(Insert(user::New {
                name,
                email,
                password_hash,
                roles,
                created_at: DateTime::now().coerce(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::AlreadyExists)
            .map_err(tracerr::wrap!())?;

        tracing::info!(id = %user.id, name = %user.name, "`User` created");

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Name`] or [`Email`] is already taken by another [`User`].
    #[display("`User` with such name or email already exists")]
    AlreadyExists,

    /// [`Password`] failed to be hashed.
    #[display("Failed to hash `Password`: {_0}")]
    PasswordHash(#[error(not(source))] argon2::password_hash::Error),
}
