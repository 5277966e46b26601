//! [`AuthState`] definitions.

use common::{DateTime, RoleSet};
use derive_more::Debug;

use crate::token;

/// Authentication state of a client, as reconstructed from its token.
///
/// Always replaced as a whole, never mutated in place.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum AuthState {
    /// No principal is signed in.
    #[default]
    SignedOut,

    /// A principal is signed in.
    Authenticated(Authenticated),
}

/// [`AuthState`] of a signed in principal.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Authenticated {
    /// ID of the principal.
    pub user_id: i64,

    /// Raw token the principal is signed in with.
    #[debug(skip)]
    pub token: String,

    /// Moment the token expires.
    pub expires_at: DateTime,

    /// Display name of the principal.
    pub display_name: String,

    /// Email of the principal.
    pub email: String,

    /// Roles of the principal.
    pub roles: RoleSet,
}

impl Authenticated {
    /// Creates a new [`Authenticated`] state out of the provided raw `token`
    /// and its [`token::Parsed`] contents.
    #[must_use]
    pub fn new(token: String, parsed: token::Parsed) -> Self {
        let token::Parsed {
            user_id,
            display_name,
            email,
            roles,
            expires_at,
        } = parsed;
        Self {
            user_id,
            token,
            expires_at,
            display_name,
            email,
            roles,
        }
    }
}

impl AuthState {
    /// Indicates whether a principal is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Returns the [`Authenticated`] state, if a principal is signed in.
    #[must_use]
    pub fn authenticated(&self) -> Option<&Authenticated> {
        match self {
            Self::Authenticated(a) => Some(a),
            Self::SignedOut => None,
        }
    }

    /// Returns the raw token of the signed in principal (if any).
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.authenticated().map(|a| a.token.as_str())
    }

    /// Returns the moment the token of the signed in principal expires
    /// (if any).
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime> {
        self.authenticated().map(|a| a.expires_at)
    }

    /// Returns the display name of the signed in principal (if any).
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.authenticated().map(|a| a.display_name.as_str())
    }

    /// Returns the roles of the signed in principal, being empty when signed
    /// out.
    #[must_use]
    pub fn roles(&self) -> RoleSet {
        self.authenticated().map_or(RoleSet::EMPTY, |a| a.roles)
    }
}
