//! Request authorization.
//!
//! An [`Authorizer`] runs after the outbound request is fully shaped and
//! may edit it in place, typically by adding an `Authorization` header.
//! Any scheme (static bearer token, signed requests, rotating tokens) is
//! just a different `Authorizer` value.

use std::sync::Arc;

use http::HeaderValue;
use http::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};

use crate::error::BoxError;

/// Attaches credentials to an outbound request before it is sent
pub type Authorizer = Arc<dyn Fn(&mut reqwest::Request) -> Result<(), BoxError> + Send + Sync>;

/// Wrap a closure as an [`Authorizer`]
#[must_use]
pub fn authorizer<F>(f: F) -> Authorizer
where
    F: Fn(&mut reqwest::Request) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Authorizer that sends `Authorization: Bearer <token>` on every request
#[must_use]
pub fn bearer_token(token: SecretString) -> Authorizer {
    authorizer(move |req| {
        let mut value = HeaderValue::try_from(format!("Bearer {}", token.expose_secret()))?;
        value.set_sensitive(true);
        req.headers_mut().append(AUTHORIZATION, value);
        Ok(())
    })
}
