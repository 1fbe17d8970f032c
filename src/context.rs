//! Per-request view used by the session manager and the login flow
//!
//! A `RequestContext` is extracted once per request. It carries the
//! inputs (path params, query, cookies, an optionally bound session)
//! and collects outgoing cookie changes, which the handler hands back
//! to Axum with [`RequestContext::into_cookie_jar`].

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, RawPathParams},
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use tower_sessions::Session;

use crate::auth::ProviderOverride;
use crate::params::Params;

/// Request inputs plus the cookie delta for the response
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    path_params: HashMap<String, String>,
    query: Params,
    cookies: CookieJar,
    bound_session: Option<Session>,
    locals: HashMap<String, String>,
}

impl RequestContext {
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Path segment captured by the router, if non-empty
    pub fn path_param(&self, key: &str) -> Option<&str> {
        self.path_params
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn query(&self) -> &Params {
        &self.query
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key)
    }

    /// Current cookie value, including cookies set earlier in this request
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(Cookie::value)
    }

    pub(crate) fn add_cookie(&mut self, cookie: Cookie<'static>) {
        self.cookies = std::mem::take(&mut self.cookies).add(cookie);
    }

    pub(crate) fn remove_cookie(&mut self, cookie: Cookie<'static>) {
        self.cookies = std::mem::take(&mut self.cookies).remove(cookie);
    }

    /// Session bound by the session layer, if any
    pub fn bound_session(&self) -> Option<&Session> {
        self.bound_session.as_ref()
    }

    /// Per-request value set by the host application
    pub fn local(&self, key: &str) -> Option<&str> {
        self.locals.get(key).map(String::as_str)
    }

    pub fn set_local(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.locals.insert(key.into(), value.into());
    }

    /// Cookie changes to send back with the response
    pub fn into_cookie_jar(self) -> CookieJar {
        self.cookies
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Routes without captures have no params to report.
        let path_params = match RawPathParams::from_request_parts(parts, state).await {
            Ok(params) => params
                .iter()
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect(),
            Err(_) => HashMap::new(),
        };

        let mut context = Self {
            path_params,
            query: parts.uri.query().map(Params::from_query).unwrap_or_default(),
            cookies: CookieJar::from_headers(&parts.headers),
            bound_session: parts.extensions.get::<Session>().cloned(),
            locals: HashMap::new(),
        };

        if let Some(ProviderOverride(provider)) = parts.extensions.get::<ProviderOverride>() {
            crate::auth::with_provider(&mut context, provider.clone());
        }

        Ok(context)
    }
}

/// Builder for contexts outside of Axum routing (hosts and tests)
#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    context: RequestContext,
    cookies: Vec<(String, String)>,
}

impl RequestContextBuilder {
    pub fn path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.path_params.insert(key.into(), value.into());
        self
    }

    /// Raw query string, e.g. `"provider=google&state=abc"`
    pub fn query(mut self, query: &str) -> Self {
        self.context.query = Params::from_query(query);
        self
    }

    /// Cookie sent by the browser
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    pub fn bound_session(mut self, session: Session) -> Self {
        self.context.bound_session = Some(session);
        self
    }

    pub fn local(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.set_local(key, value);
        self
    }

    pub fn build(mut self) -> RequestContext {
        // Go through a Cookie header so these count as incoming
        // cookies rather than part of the response delta.
        let line = self
            .cookies
            .iter()
            .map(|(name, value)| Cookie::new(name.clone(), value.clone()).encoded().to_string())
            .collect::<Vec<_>>()
            .join("; ");
        let mut headers = HeaderMap::new();
        if !line.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&line) {
                headers.insert(header::COOKIE, value);
            }
        }
        self.context.cookies = CookieJar::from_headers(&headers);
        self.context
    }
}
