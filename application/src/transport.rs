//! [`Transport`] of [`session::Token`]s over HTTP.

use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{authorization::Bearer, Authorization, HeaderMapExt as _},
};
use common::DateTimeOf;
use service::domain::user::session;

/// Carrier of [`session::Token`]s in HTTP requests and responses.
///
/// Tokens are read from the cookie first, falling back to the
/// `Authorization: Bearer` header, and are written to the cookie only.
#[derive(Clone, Debug)]
pub struct Transport {
    /// Name of the cookie carrying [`session::Token`]s.
    cookie_name: String,

    /// Indicator whether the cookie is restricted to HTTPS.
    secure: bool,
}

impl Transport {
    /// Creates a new [`Transport`] using the cookie with the provided name.
    #[must_use]
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            secure: true,
        }
    }

    /// Sets whether the cookie is restricted to HTTPS.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Extracts a candidate [`session::Token`] from the provided request
    /// headers, if any.
    ///
    /// The header is only looked at when the cookie is absent.
    #[must_use]
    pub fn extract(&self, headers: &http::HeaderMap) -> Option<session::Token> {
        if let Some(cookie) = CookieJar::from_headers(headers)
            .get(&self.cookie_name)
            .filter(|c| !c.value().is_empty())
        {
            return Some(cookie.value().into());
        }

        headers
            .typed_get::<Authorization<Bearer>>()
            .map(|Authorization(bearer)| bearer.token().into())
    }

    /// Adds the cookie carrying the provided [`session::Token`] to the
    /// [`CookieJar`], expiring along with the [`session::Token`].
    #[must_use]
    pub fn attach<Of: ?Sized>(
        &self,
        jar: CookieJar,
        token: &session::Token,
        expires_at: DateTimeOf<Of>,
    ) -> CookieJar {
        let mut cookie = self.cookie(token.to_string());
        cookie.set_expires(time::OffsetDateTime::from(expires_at));
        jar.add(cookie)
    }

    /// Adds the cookie removing the previously attached one to the
    /// [`CookieJar`].
    ///
    /// A copy of the removed [`session::Token`] stays valid until it expires.
    #[must_use]
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let mut cookie = self.cookie(String::new());
        cookie.make_removal();
        jar.add(cookie)
    }

    /// Builds the cookie with the provided `value` and common attributes.
    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .build()
    }
}

#[cfg(test)]
mod spec {
    use axum_extra::extract::cookie::{CookieJar, SameSite};
    use common::DateTime;
    use service::domain::user::session;

    use super::Transport;

    fn headers(pairs: &[(&'static str, &str)]) -> http::HeaderMap {
        pairs
            .iter()
            .map(|(k, v)| {
                (http::HeaderName::from_static(k), v.parse().unwrap())
            })
            .collect()
    }

    #[test]
    fn prefers_cookie_over_header() {
        let transport = Transport::new("auth_token");

        let token = transport.extract(&headers(&[
            ("cookie", "theme=dark; auth_token=from-cookie"),
            ("authorization", "Bearer from-header"),
        ]));

        assert_eq!(token, Some(session::Token::from("from-cookie")));
    }

    #[test]
    fn falls_back_to_bearer_header() {
        let transport = Transport::new("auth_token");

        assert_eq!(
            transport.extract(&headers(&[
                ("cookie", "theme=dark"),
                ("authorization", "Bearer from-header"),
            ])),
            Some(session::Token::from("from-header")),
        );
        assert_eq!(
            transport
                .extract(&headers(&[("authorization", "Basic YTpi")])),
            None,
        );
        assert_eq!(transport.extract(&http::HeaderMap::new()), None);
    }

    #[test]
    fn attaches_restricted_cookie() {
        let transport = Transport::new("auth_token");
        let expires_at = DateTime::from_unix_timestamp(1_900_000_000).unwrap();

        let jar = transport.attach(
            CookieJar::new(),
            &session::Token::from("abc"),
            expires_at,
        );
        let cookie = jar.get("auth_token").unwrap();

        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(
            cookie.expires_datetime().map(|t| t.unix_timestamp()),
            Some(1_900_000_000),
        );
    }

    #[test]
    fn clears_with_removal_cookie() {
        let transport = Transport::new("auth_token");

        let jar = transport.clear(CookieJar::new());
        let cookie = jar.get("auth_token").unwrap();

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
