//! [`Role`] and [`RoleSet`] definitions.

use std::{fmt, ops, str::FromStr};

use derive_more::{Display, Error};
use strum::{EnumString, IntoStaticStr};

/// Authorization role of a principal.
///
/// The set of roles is closed: every [`Role`] occupies a single bit of a
/// [`RoleSet`], and its name is exactly what is carried in a token claim.
#[derive(
    Clone,
    Copy,
    Debug,
    strum::Display,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
)]
#[repr(u8)]
pub enum Role {
    /// Regular user.
    User = 1 << 0,

    /// Registered member.
    Member = 1 << 1,

    /// Content moderator.
    Moderator = 1 << 2,

    /// Administrator.
    Admin = 1 << 3,
}

impl Role {
    /// All the [`Role`]s in their declared order.
    pub const ALL: [Self; 4] =
        [Self::User, Self::Member, Self::Moderator, Self::Admin];

    /// Returns the bit occupied by this [`Role`] in a [`RoleSet`].
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Returns the claim name of this [`Role`].
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Set of [`Role`]s, stored as a bitmask.
///
/// Only the bits of known [`Role`]s are ever set: unknown bits are dropped on
/// construction.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct RoleSet(u8);

impl RoleSet {
    /// Empty [`RoleSet`].
    pub const EMPTY: Self = Self(0);

    /// [`RoleSet`] containing every [`Role`].
    pub const ALL: Self = Self(
        Role::User.bit()
            | Role::Member.bit()
            | Role::Moderator.bit()
            | Role::Admin.bit(),
    );

    /// Creates a [`RoleSet`] out of the raw `bits`, ignoring the ones not
    /// belonging to any [`Role`].
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Returns the raw bits of this [`RoleSet`].
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Indicates whether this [`RoleSet`] has no [`Role`]s.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Indicates whether this [`RoleSet`] contains the provided [`Role`].
    #[must_use]
    pub const fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    /// Indicates whether this [`RoleSet`] shares at least one [`Role`] with
    /// the `other` one.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns the [`Role`]s present in either of the [`RoleSet`]s.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns the [`Role`]s present in both of the [`RoleSet`]s.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Iterates over the [`Role`]s of this [`RoleSet`] in their declared
    /// order.
    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }

    /// Expands this [`RoleSet`] into one claim per contained [`Role`].
    #[must_use]
    pub fn encode(self) -> Vec<&'static str> {
        self.iter().map(Role::name).collect()
    }

    /// Collapses the provided claims back into a [`RoleSet`].
    ///
    /// Claims not naming any known [`Role`] are dropped.
    pub fn decode<I>(claims: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        claims
            .into_iter()
            .filter_map(|c| c.as_ref().parse::<Role>().ok())
            .collect()
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> Self {
        Self(role.bit())
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        iter.into_iter().fold(Self::EMPTY, |set, r| set | r)
    }
}

impl ops::BitOr for RoleSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl ops::BitOr<Role> for RoleSet {
    type Output = Self;

    fn bitor(self, rhs: Role) -> Self::Output {
        self.union(rhs.into())
    }
}

impl ops::BitOr for Role {
    type Output = RoleSet;

    fn bitor(self, rhs: Self) -> Self::Output {
        RoleSet::from(self) | rhs
    }
}

impl ops::BitOrAssign<Role> for RoleSet {
    fn bitor_assign(&mut self, rhs: Role) {
        *self = *self | rhs;
    }
}

impl ops::BitAnd for RoleSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(rhs)
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, role) in self.iter().enumerate() {
            if n > 0 {
                f.write_str(",")?;
            }
            f.write_str(role.name())?;
        }
        Ok(())
    }
}

impl FromStr for RoleSet {
    type Err = ParseRoleSetError;

    /// Parses a comma-separated list of [`Role`] names, like
    /// `Admin,Moderator`.
    ///
    /// Unlike [`RoleSet::decode()`], unknown names are rejected here, as this
    /// is meant for declaring requirements, where a typo must not silently
    /// widen or narrow the access.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                name.parse::<Role>()
                    .map_err(|_| ParseRoleSetError(name.to_owned()))
            })
            .collect()
    }
}

/// Error of parsing a [`RoleSet`] from a string.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("unknown role: `{_0}`")]
pub struct ParseRoleSetError(#[error(not(source))] String);

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.
    //!
    //! [`RoleSet`] is represented as its raw bitmask.

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::RoleSet;

    impl Serialize for RoleSet {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_u8(self.bits())
        }
    }

    impl<'de> Deserialize<'de> for RoleSet {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            u8::deserialize(d).map(Self::from_bits)
        }
    }
}
