//! [`Session`] definitions.

use std::{fmt, time::Duration};

use common::{auth::Claims, unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Debug, Display, Error, From};
use jsonwebtoken::{
    errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user::{self, Principal};

/// Verified user session, as asserted by a [`Token`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Session {
    /// [`Principal`] this [`Session`] belongs to.
    pub principal: Principal,

    /// ID of the [`Token`] this [`Session`] was verified from.
    pub token_id: TokenId,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: ExpirationDateTime,
}

/// Access token of a [`Session`].
///
/// Nothing is guaranteed about the contents until it's verified with a
/// [`Codec`].
#[derive(AsRef, Clone, Display, Eq, From, PartialEq)]
#[as_ref(str)]
#[from(String, &str)]
pub struct Token(String);

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Unique ID of an issued [`Token`].
#[derive(Clone, Copy, Debug, Display, Eq, From, Hash, PartialEq)]
pub struct TokenId(Uuid);

impl TokenId {
    /// Generates a new random [`TokenId`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;

/// Freshly issued [`Token`] along with what it asserts.
#[derive(Clone, Debug)]
pub struct Issued {
    /// Issued [`Token`].
    pub token: Token,

    /// [`TokenId`] of the issued [`Token`].
    pub token_id: TokenId,

    /// [`DateTime`] when the issued [`Token`] expires.
    pub expires_at: ExpirationDateTime,
}

/// Reason of a [`Token`] being rejected by a [`Codec`].
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum Rejection {
    /// [`Token`] is not a well-formed token, or misses required claims.
    #[display("malformed token")]
    Malformed,

    /// [`Token`] signature doesn't match its contents.
    #[display("bad token signature")]
    BadSignature,

    /// [`Token`] was issued by someone else, or for someone else.
    #[display("wrong token issuer or audience")]
    WrongIssuerOrAudience,

    /// [`Token`] has expired.
    #[display("token has expired")]
    Expired,

    /// [`Token`] is not valid yet.
    #[display("token is not valid yet")]
    NotYetValid,
}

impl From<jsonwebtoken::errors::Error> for Rejection {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                Self::BadSignature
            }
            ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                Self::WrongIssuerOrAudience
            }
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            _ => Self::Malformed,
        }
    }
}

/// Issuer and verifier of [`Token`]s.
///
/// Signs with HMAC-SHA-256 using a symmetric key: the same [`Codec`] must be
/// used for issuing and verifying within a deployment.
#[derive(Clone, Debug)]
pub struct Codec {
    /// Key [`Token`]s are signed with.
    #[debug(skip)]
    encoding_key: EncodingKey,

    /// Key [`Token`] signatures are verified with.
    #[debug(skip)]
    decoding_key: DecodingKey,

    /// Expected issuer of [`Token`]s.
    issuer: String,

    /// Expected audience of [`Token`]s.
    audience: String,

    /// Tolerated clock skew, applied to both validity bounds.
    leeway: Duration,
}

impl Codec {
    /// [`Algorithm`] [`Token`]s are signed with.
    const ALGORITHM: Algorithm = Algorithm::HS256;

    /// Creates a new [`Codec`] out of the provided `secret` key.
    ///
    /// # Errors
    ///
    /// If the provided `secret` is empty.
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        leeway: Duration,
    ) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if secret.len() < 32 {
            tracing::warn!("JWT secret is shorter than recommended 32 bytes");
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
            leeway,
        })
    }

    /// Issues a new [`Token`] for the provided [`Principal`], valid from
    /// `now` and for the `ttl` [`Duration`].
    ///
    /// # Errors
    ///
    /// If the [`Token`] fails to be signed.
    pub fn issue(
        &self,
        principal: &Principal,
        now: DateTime,
        ttl: Duration,
    ) -> Result<Issued, jsonwebtoken::errors::Error> {
        let token_id = TokenId::new();
        // Tokens carry whole seconds only.
        let now = now.truncated_to_seconds();
        let expires_at = now + ttl;

        let claims = Claims {
            sub: principal.id.to_string(),
            email: principal.email.to_string(),
            name: principal.name.to_string(),
            jti: token_id.to_string(),
            not_before: now.coerce(),
            expires_at: expires_at.coerce(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            roles: principal.roles,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Self::ALGORITHM),
            &claims,
            &self.encoding_key,
        )?;

        Ok(Issued {
            token: token.into(),
            token_id,
            expires_at: expires_at.coerce(),
        })
    }

    /// Verifies the provided [`Token`] at the `now` moment, reconstructing
    /// the [`Session`] it asserts.
    ///
    /// The signature is checked before anything else in the [`Token`] is
    /// looked at.
    ///
    /// # Errors
    ///
    /// With the [`Rejection`] describing the first failed check.
    pub fn verify(
        &self,
        token: &Token,
        now: DateTime,
    ) -> Result<Session, Rejection> {
        let mut validation = Validation::new(Self::ALGORITHM);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["sub", "nbf", "exp", "iss", "aud"]);
        // Time bounds are checked below against the provided `now`, rather
        // than the system clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let claims = jsonwebtoken::decode::<Claims>(
            token.as_ref(),
            &self.decoding_key,
            &validation,
        )?
        .claims;

        let leeway = self.leeway.as_secs().try_into().unwrap_or(i64::MAX);
        let now = now.unix_timestamp();
        if now < claims.not_before.unix_timestamp().saturating_sub(leeway) {
            return Err(Rejection::NotYetValid);
        }
        if now >= claims.expires_at.unix_timestamp().saturating_add(leeway) {
            return Err(Rejection::Expired);
        }

        let Claims {
            sub,
            email,
            name,
            jti,
            expires_at,
            roles,
            ..
        } = claims;
        Ok(Session {
            principal: Principal {
                id: sub.parse().map_err(|_| Rejection::Malformed)?,
                name: user::Name::new(name).ok_or(Rejection::Malformed)?,
                email: user::Email::new(email).ok_or(Rejection::Malformed)?,
                roles,
            },
            token_id: jti
                .parse::<Uuid>()
                .map(TokenId)
                .map_err(|_| Rejection::Malformed)?,
            expires_at: expires_at.coerce(),
        })
    }
}

/// Error of creating a [`Codec`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum ConfigError {
    /// Provided secret key is empty.
    #[display("JWT secret must not be empty")]
    EmptySecret,
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{DateTime, Role, RoleSet};

    use crate::domain::user::{Email, Name, Principal};

    use super::{Codec, Rejection, Token};

    const TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
    const LEEWAY: Duration = Duration::from_secs(60);

    fn codec() -> Codec {
        Codec::new(
            b"0123456789abcdef0123456789abcdef",
            "site",
            "site-clients",
            LEEWAY,
        )
        .unwrap()
    }

    fn principal(roles: RoleSet) -> Principal {
        Principal {
            id: 42.into(),
            name: Name::new("alice").unwrap(),
            email: Email::new("alice@x.com").unwrap(),
            roles,
        }
    }

    fn issued_at() -> DateTime {
        DateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    fn issue(roles: RoleSet) -> Token {
        codec()
            .issue(&principal(roles), issued_at(), TTL)
            .unwrap()
            .token
    }

    #[test]
    fn verifies_issued_token() {
        let codec = codec();
        let issued = codec
            .issue(&principal(Role::Member | Role::Admin), issued_at(), TTL)
            .unwrap();

        let session = codec.verify(&issued.token, issued_at()).unwrap();

        assert_eq!(session.principal, principal(Role::Member | Role::Admin));
        assert_eq!(session.token_id, issued.token_id);
        assert_eq!(session.expires_at, issued.expires_at);
        assert_eq!(
            session.expires_at.unix_timestamp(),
            issued_at().unix_timestamp() + 7 * 24 * 60 * 60,
        );
    }

    #[test]
    fn issues_unique_token_ids() {
        let codec = codec();
        let p = principal(RoleSet::EMPTY);

        let a = codec.issue(&p, issued_at(), TTL).unwrap();
        let b = codec.issue(&p, issued_at(), TTL).unwrap();

        assert_ne!(a.token_id, b.token_id);
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn expires_after_ttl() {
        let token = issue(Role::User.into());
        let eps = LEEWAY + Duration::from_secs(30);

        assert!(codec().verify(&token, issued_at() + TTL - eps).is_ok());
        assert_eq!(
            codec().verify(&token, issued_at() + TTL + eps),
            Err(Rejection::Expired),
        );
    }

    #[test]
    fn tolerates_clock_skew() {
        let token = issue(Role::User.into());
        let skew = LEEWAY - Duration::from_secs(1);

        assert!(codec().verify(&token, issued_at() + TTL + skew).is_ok());
        assert!(codec().verify(&token, issued_at() - skew).is_ok());
    }

    #[test]
    fn is_not_valid_before_issuance() {
        let token = issue(Role::User.into());

        assert_eq!(
            codec().verify(&token, issued_at() - LEEWAY * 2),
            Err(Rejection::NotYetValid),
        );
    }

    #[test]
    fn rejects_any_altered_signature_char() {
        let token = issue(Role::Moderator.into());
        let token = token.as_ref();
        let sig_start = token.rfind('.').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut altered = token.as_bytes().to_vec();
            altered[i] = if altered[i] == b'A' { b'B' } else { b'A' };
            let altered = Token::from(String::from_utf8(altered).unwrap());

            assert_eq!(
                codec().verify(&altered, issued_at()),
                Err(Rejection::BadSignature),
                "altered signature char: {i}",
            );
        }
    }

    #[test]
    fn rejects_foreign_key() {
        let foreign = Codec::new(
            b"another-secret-of-sufficient-size",
            "site",
            "site-clients",
            LEEWAY,
        )
        .unwrap();
        let token = foreign
            .issue(&principal(Role::Admin.into()), issued_at(), TTL)
            .unwrap()
            .token;

        assert_eq!(
            codec().verify(&token, issued_at()),
            Err(Rejection::BadSignature),
        );
    }

    #[test]
    fn rejects_wrong_issuer_or_audience() {
        let key = b"0123456789abcdef0123456789abcdef";
        for (issuer, audience) in
            [("other", "site-clients"), ("site", "other-clients")]
        {
            let token = Codec::new(key, issuer, audience, LEEWAY)
                .unwrap()
                .issue(&principal(Role::User.into()), issued_at(), TTL)
                .unwrap()
                .token;

            assert_eq!(
                codec().verify(&token, issued_at()),
                Err(Rejection::WrongIssuerOrAudience),
                "issuer: {issuer}, audience: {audience}",
            );
        }
    }

    #[test]
    fn rejects_malformed() {
        for token in ["", "garbage", "a.b", "a.b.c", "e30.e30.c2ln"] {
            assert_eq!(
                codec().verify(&Token::from(token), issued_at()),
                Err(Rejection::Malformed),
                "token: {token:?}",
            );
        }
    }

    #[test]
    fn refuses_empty_secret() {
        assert!(Codec::new(b"", "site", "site-clients", LEEWAY).is_err());
    }
}
