//! In-memory [`Database`] implementation.

use std::{collections::BTreeMap, sync::Arc};

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error as StdError};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
};

/// [`Database`] keeping everything in the process memory.
///
/// Clones share the same storage, so it can be handed out freely.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored [`User`]s.
    users: Arc<RwLock<Users>>,
}

/// Table of [`User`]s.
#[derive(Debug, Default)]
struct Users {
    /// Last [`user::Id`] handed out.
    last_id: i64,

    /// [`User`]s by their [`user::Id`]s.
    rows: BTreeMap<user::Id, User>,
}

impl Users {
    /// Looks up the [`User`] identified by the provided [`user::Identifier`].
    fn find(&self, identifier: &user::Identifier) -> Option<&User> {
        self.rows.values().find(|u| match identifier {
            user::Identifier::Name(name) => &u.name == name,
            user::Identifier::Email(email) => u.email.matches(email),
        })
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.users.read().await.rows.get(&by.into_inner()).cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Identifier>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Identifier>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.users.read().await.find(by.into_inner()).cloned())
    }
}

/// Inserts a [`user::New`], returning the stored [`User`].
///
/// [`None`] is returned if its [`user::Name`] or [`user::Email`] is already
/// taken by another [`User`].
impl Database<Insert<user::New>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(new): Insert<user::New>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut users = self.users.write().await;

        let taken = users
            .find(&user::Identifier::Name(new.name.clone()))
            .or_else(|| users.find(&user::Identifier::Email(new.email.clone())))
            .is_some();
        if taken {
            return Ok(None);
        }

        let id = users.last_id.checked_add(1).ok_or_else(|| {
            tracerr::new!(database::Error::from(Error::IdsExhausted))
        })?;
        users.last_id = id;

        let user = new.with_id(id.into());
        drop(users.rows.insert(user.id, user.clone()));

        Ok(Some(user))
    }
}

/// [`Memory`] error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// No more [`user::Id`]s can be handed out.
    #[display("`User` IDs are exhausted")]
    IdsExhausted,
}
