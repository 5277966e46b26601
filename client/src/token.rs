//! Client-side reading of issued tokens.
//!
//! Signatures are not verified here: the client holds no key, and the server
//! verifies every token it is presented with anyway.

use common::{auth::Claims, DateTime, RoleSet};
use derive_more::{Display, Error};
use jsonwebtoken::{DecodingKey, Validation};

/// Contents of an issued token, as far as the client cares.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parsed {
    /// ID of the principal.
    pub user_id: i64,

    /// Display name of the principal.
    pub display_name: String,

    /// Email of the principal.
    pub email: String,

    /// Roles of the principal.
    pub roles: RoleSet,

    /// Moment the token expires.
    pub expires_at: DateTime,
}

/// Parses the provided `token` and checks it's not expired at the `now`
/// moment.
///
/// # Errors
///
/// If the `token` is malformed, or has expired.
pub fn parse(token: &str, now: DateTime) -> Result<Parsed, ParseError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.validate_exp = false;
    validation.validate_nbf = false;

    let claims = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(&[]),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("failed to parse token: {e}");
        ParseError::Malformed
    })?
    .claims;

    let expires_at: DateTime = claims.expires_at.coerce();
    if now >= expires_at {
        return Err(ParseError::Expired);
    }

    Ok(Parsed {
        user_id: claims.sub.parse().map_err(|_| ParseError::Malformed)?,
        display_name: claims.name,
        email: claims.email,
        roles: claims.roles,
        expires_at,
    })
}

/// Error of [`parse`]-ing a token.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum ParseError {
    /// Token is not a well-formed token.
    #[display("malformed token")]
    Malformed,

    /// Token has expired.
    #[display("token has expired")]
    Expired,
}

#[cfg(test)]
pub(crate) mod spec {
    use std::time::Duration;

    use common::{auth::Claims, DateTime, Role, RoleSet};
    use jsonwebtoken::{EncodingKey, Header};

    use super::{parse, ParseError, Parsed};

    /// Issues a token for the provided principal, expiring in `ttl` seconds
    /// (negative for already expired ones).
    pub(crate) fn issue(id: i64, name: &str, roles: RoleSet, ttl: i64) -> String {
        let now = DateTime::now().truncated_to_seconds();
        let exp = if ttl >= 0 {
            now + Duration::from_secs(ttl.unsigned_abs())
        } else {
            now - Duration::from_secs(ttl.unsigned_abs())
        };
        let claims = Claims {
            sub: id.to_string(),
            email: format!("{name}@x.com"),
            name: name.to_owned(),
            jti: format!("jti-{id}-{name}"),
            not_before: (now - Duration::from_secs(3600)).coerce(),
            expires_at: exp.coerce(),
            iss: "site".into(),
            aud: "site-clients".into(),
            roles,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"server-side-secret"),
        )
        .unwrap()
    }

    #[test]
    fn reads_claims_without_key() {
        let token = issue(7, "alice", Role::Member | Role::Admin, 3600);

        let parsed = parse(&token, DateTime::now()).unwrap();

        assert_eq!(
            parsed,
            Parsed {
                user_id: 7,
                display_name: "alice".into(),
                email: "alice@x.com".into(),
                roles: Role::Member | Role::Admin,
                expires_at: parsed.expires_at,
            },
        );
        assert!(parsed.expires_at > DateTime::now());
    }

    #[test]
    fn rejects_expired() {
        let token = issue(7, "alice", RoleSet::EMPTY, -10);

        assert_eq!(
            parse(&token, DateTime::now()),
            Err(ParseError::Expired),
        );
    }

    #[test]
    fn rejects_malformed() {
        for token in ["", "garbage", "a.b.c"] {
            assert_eq!(
                parse(token, DateTime::now()),
                Err(ParseError::Malformed),
                "token: {token:?}",
            );
        }
    }
}
