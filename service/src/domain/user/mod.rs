//! [`User`] definitions.

pub mod session;

use std::{str::FromStr, sync::LazyLock};

use argon2::{
    password_hash::{self, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Argon2,
};
#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, RoleSet};
use derive_more::{AsRef, Display, From, Into};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};

pub use self::session::Session;

/// Registered user.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Name`] of this [`User`].
    pub name: Name,

    /// [`Email`] of this [`User`].
    pub email: Email,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// Roles granted to this [`User`].
    pub roles: RoleSet,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,
}

/// [`User`] not yet stored, and so having no [`Id`] yet.
#[derive(Clone, Debug)]
pub struct New {
    /// [`Name`] of the new [`User`].
    pub name: Name,

    /// [`Email`] of the new [`User`].
    pub email: Email,

    /// [`PasswordHash`] of the new [`User`].
    pub password_hash: PasswordHash,

    /// Roles granted to the new [`User`].
    pub roles: RoleSet,

    /// [`DateTime`] when the new [`User`] was created.
    pub created_at: CreationDateTime,
}

impl New {
    /// Turns this [`New`] user into a stored [`User`] with the provided
    /// [`Id`].
    #[must_use]
    pub fn with_id(self, id: Id) -> User {
        let Self {
            name,
            email,
            password_hash,
            roles,
            created_at,
        } = self;
        User {
            id,
            name,
            email,
            password_hash,
            roles,
            created_at,
        }
    }
}

/// Authenticated identity of a [`User`] along with its roles.
///
/// This is everything a token asserts about its bearer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Principal {
    /// [`Id`] of the [`User`].
    pub id: Id,

    /// [`Name`] of the [`User`], used for display.
    pub name: Name,

    /// [`Email`] of the [`User`].
    pub email: Email,

    /// Roles granted to the [`User`].
    pub roles: RoleSet,
}

impl Principal {
    /// Indicates whether this [`Principal`] has at least one of the
    /// `required` roles.
    #[must_use]
    pub fn has_any_role(&self, required: RoleSet) -> bool {
        self.roles.intersects(required)
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            roles: user.roles,
        }
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        let User {
            id,
            name,
            email,
            roles,
            ..
        } = user;
        Self {
            id,
            name,
            email,
            roles,
        }
    }
}

/// ID of a [`User`].
#[derive(
    Clone, Copy, Debug, Display, Eq, From, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Id(i64);

impl FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Name of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Name`] invariants:
        /// - Must consist of letters, digits, `_`, `.` or `-` only;
        /// - Must be between 3 and 32 characters long.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[\p{L}\p{N}_.\-]{3,32}$").expect("valid regex")
        });

        REGEX.is_match(name.as_ref())
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Password(String);

impl Password {
    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Creates a new [`Password`] without checking its format.
    ///
    /// Used for passwords being verified rather than set, as the format rules
    /// may have changed since the [`PasswordHash`] was computed.
    #[must_use]
    pub fn unchecked(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: impl AsRef<str>) -> bool {
        let password = password.as_ref();
        password.chars().count() >= 6 && password.len() <= 128
    }
}

impl AsRef<[u8]> for Password {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Password hash of a [`User`], in the [PHC string format].
///
/// [PHC string format]: https://github.com/P-H-C/phc-string-format
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes the provided [`Password`] with [Argon2] and a random salt.
    ///
    /// # Errors
    ///
    /// If no randomness is available for the salt, or hashing fails.
    ///
    /// [Argon2]: https://en.wikipedia.org/wiki/Argon2
    pub fn new(password: &Password) -> Result<Self, password_hash::Error> {
        let mut salt = [0; 16];
        getrandom::getrandom(&mut salt)
            .map_err(|_| password_hash::Error::Crypto)?;
        let salt = SaltString::encode_b64(&salt)?;

        Ok(Self(
            Argon2::default()
                .hash_password(password.as_ref(), &salt)?
                .to_string(),
        ))
    }

    /// Checks whether the provided [`Password`] matches this
    /// [`PasswordHash`].
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        password_hash::PasswordHash::new(&self.0).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_ref(), &parsed)
                .is_ok()
        })
    }

    /// Spends the same effort as [`PasswordHash::verify()`] does, without
    /// any [`PasswordHash`] to check the provided [`Password`] against.
    ///
    /// Makes logins of unknown [`User`]s take as long as the ones with a
    /// wrong [`Password`].
    pub fn verify_nothing(password: &Password) {
        if let Some(hash) = Self::dummy() {
            _ = hash.verify(password);
        }
    }

    /// Returns the [`PasswordHash`] no [`User`] is ever checked against.
    fn dummy() -> Option<&'static Self> {
        static DUMMY: LazyLock<Option<PasswordHash>> = LazyLock::new(|| {
            PasswordHash::new(&Password::unchecked("unusable")).ok()
        });

        DUMMY.as_ref()
    }
}

/// Email address of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Indicates whether this [`Email`] denotes the same mailbox as the
    /// `other` one.
    ///
    /// Domains are case-insensitive, and so are local parts in practice.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                "^([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                  |\\x5c[\\x00-\\x7f])*\\x22)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x22))*\\x40\
                  ([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d))*$",
            )
            .expect("valid regex")
        });

        address.as_ref().len() <= 254 && REGEX.is_match(address.as_ref())
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Identifier a [`User`] logs in with: either its [`Name`] or its [`Email`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Identifier {
    /// [`Name`] of a [`User`].
    Name(Name),

    /// [`Email`] of a [`User`].
    Email(Email),
}

impl Identifier {
    /// Parses the provided `identifier`, if it's a valid [`Email`] or
    /// [`Name`].
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Option<Self> {
        let identifier = identifier.into();
        if identifier.contains('@') {
            Email::new(identifier).map(Self::Email)
        } else {
            Name::new(identifier).map(Self::Name)
        }
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;
