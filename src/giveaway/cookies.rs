use std::collections::BTreeMap;

use axum::http::HeaderMap;
use axum::http::header::COOKIE;

// One year.
pub const DEFAULT_COOKIE_MAX_AGE: u64 = 31_536_000;

// Name of the cookie that keeps the creator password of the giveaway.
pub fn password_cookie_name(slug: &str) -> String {
    format!("giveaway_{}_password", slug)
}

// Renders a `Set-Cookie` value.
pub fn build_cookie(name: &str, value: &str, max_age: u64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Strict",
        name, value, max_age
    )
}

// `Set-Cookie` value that hands the creator password of the giveaway to the client.
pub fn giveaway_password_cookie(slug: &str, password: &str, max_age: u64) -> String {
    build_cookie(&password_cookie_name(slug), password, max_age)
}

/// Cookies sent by the client.
///
/// The creator password lives only here: there is no server-side way to
/// recover it once the cookie is gone.
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    // Parses a `Cookie` header value ("a=1; b=2"). Pairs without `=` are skipped.
    pub fn parse(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .filter(|(name, _)| !name.is_empty())
            .collect::<BTreeMap<String, String>>();
        CookieJar { cookies }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<&str>>()
            .join("; ");
        CookieJar::parse(&header)
    }

    // Returns the cookie value, treating an empty value as missing.
    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .get(name)
            .filter(|value| !value.is_empty())
            .cloned()
    }

    pub fn get_giveaway_password(&self, slug: &str) -> Option<String> {
        self.get(&password_cookie_name(slug))
    }
}
