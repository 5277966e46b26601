//! Wire-level definitions of the authentication API.
//!
//! Shared between the server issuing tokens and the clients reading them.

use serde::{Deserialize, Serialize};

use crate::{unit, DateTimeOf, RoleSet};

/// Set of claims carried by an authentication token.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Claims {
    /// ID of the principal the token is issued for.
    pub sub: String,

    /// Email of the principal.
    pub email: String,

    /// Display name of the principal.
    #[serde(rename = "unique_name")]
    pub name: String,

    /// Unique ID of the token.
    pub jti: String,

    /// Moment the token becomes valid.
    #[serde(rename = "nbf", with = "crate::datetime::serde::unix_timestamp")]
    pub not_before: DateTimeOf<(Claims, unit::Activation)>,

    /// Moment the token expires.
    #[serde(rename = "exp", with = "crate::datetime::serde::unix_timestamp")]
    pub expires_at: DateTimeOf<(Claims, unit::Expiration)>,

    /// Issuer of the token.
    pub iss: String,

    /// Audience of the token.
    pub aud: String,

    /// Roles of the principal, one claim per role.
    #[serde(
        rename = "role",
        default,
        skip_serializing_if = "role_claims::is_empty",
        with = "role_claims"
    )]
    pub roles: RoleSet,
}

mod role_claims {
    //! (De)serialization of a [`RoleSet`] as a list of role claims.
    //!
    //! A lone claim is also accepted as a plain string, since some issuers
    //! collapse single-element claim lists.

    use serde::{Deserialize, Deserializer, Serialize as _, Serializer};

    use crate::RoleSet;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RoleClaims {
        One(String),
        Many(Vec<String>),
    }

    #[expect(clippy::trivially_copy_pass_by_ref, reason = "`serde` signature")]
    pub(super) fn is_empty(roles: &RoleSet) -> bool {
        roles.is_empty()
    }

    #[expect(clippy::trivially_copy_pass_by_ref, reason = "`serde` signature")]
    pub(super) fn serialize<S: Serializer>(
        roles: &RoleSet,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        roles.encode().serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<RoleSet, D::Error> {
        Ok(match RoleClaims::deserialize(deserializer)? {
            RoleClaims::One(claim) => RoleSet::decode([claim]),
            RoleClaims::Many(claims) => RoleSet::decode(claims),
        })
    }
}

/// Body of a registration request.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Desired username.
    pub username: String,

    /// Email address.
    pub email: String,

    /// Password.
    pub password: String,
}

/// Body of a login request.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username or email address.
    pub username_or_email: String,

    /// Password.
    pub password: String,
}

/// Response to a successful login or registration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Issued token.
    pub token: String,

    /// Scheme to present the [`AuthResponse::token`] with.
    pub token_type: String,

    /// Moment the [`AuthResponse::token`] expires.
    #[serde(with = "crate::datetime::serde::rfc3339")]
    pub expires_at: DateTimeOf<(AuthResponse, unit::Expiration)>,

    /// Authenticated principal.
    pub user: MeResponse,
}

/// Description of the authenticated principal.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    /// ID of the principal.
    pub id: i64,

    /// Display name of the principal.
    pub username: String,

    /// Email of the principal.
    pub email: String,

    /// Roles of the principal.
    pub roles: RoleSet,
}

#[cfg(test)]
mod spec {
    use serde_json::json;

    use crate::{DateTime, Role, RoleSet};

    use super::Claims;

    fn claims(roles: RoleSet) -> Claims {
        Claims {
            sub: "7".into(),
            email: "alice@x.com".into(),
            name: "alice".into(),
            jti: "0b6d0e2e-4a7e-4b43-9d6c-2f3c1f6a0a11".into(),
            not_before: DateTime::from_unix_timestamp(1_700_000_000)
                .unwrap()
                .coerce(),
            expires_at: DateTime::from_unix_timestamp(1_700_000_600)
                .unwrap()
                .coerce(),
            iss: "site".into(),
            aud: "site-clients".into(),
            roles,
        }
    }

    #[test]
    fn serializes_registered_claim_names() {
        let value =
            serde_json::to_value(claims(Role::Member | Role::Admin)).unwrap();

        assert_eq!(
            value,
            json!({
                "sub": "7",
                "email": "alice@x.com",
                "unique_name": "alice",
                "jti": "0b6d0e2e-4a7e-4b43-9d6c-2f3c1f6a0a11",
                "nbf": 1_700_000_000,
                "exp": 1_700_000_600,
                "iss": "site",
                "aud": "site-clients",
                "role": ["Member", "Admin"],
            }),
        );
    }

    #[test]
    fn omits_roles_when_empty() {
        let value = serde_json::to_value(claims(RoleSet::EMPTY)).unwrap();

        assert!(value.get("role").is_none());
        let back: Claims = serde_json::from_value(value).unwrap();
        assert_eq!(back.roles, RoleSet::EMPTY);
    }

    #[test]
    fn accepts_single_role_claim() {
        let mut value = serde_json::to_value(claims(RoleSet::EMPTY)).unwrap();
        value["role"] = json!("Moderator");

        let back: Claims = serde_json::from_value(value).unwrap();

        assert_eq!(back.roles, RoleSet::from(Role::Moderator));
    }

    #[test]
    fn drops_unknown_role_claims() {
        let mut value = serde_json::to_value(claims(RoleSet::EMPTY)).unwrap();
        value["role"] = json!(["Admin", "Janitor"]);

        let back: Claims = serde_json::from_value(value).unwrap();

        assert_eq!(back.roles, RoleSet::from(Role::Admin));
    }
}
