use http::Method;
use serde::Serialize;

use crate::body::Body;
use crate::error::{Error, Result};
use crate::params::Params;

const JSON_CONTENT_TYPE: &str = "application/json";

/// One API call: resource path, query parameters, verb and optional payload
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    params: Params,
    body: Body,
    content_type: Option<String>,
}

impl Request {
    /// Create a new request builder
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Shorthand for a GET of `path` with no parameters
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            params: Params::default(),
            body: Body::Empty,
            content_type: None,
        }
    }

    /// Get the HTTP method
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the resource path, relative to the versioned API root
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the query parameters
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Get the request body
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Content type of the body, if one was given
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// Builder for constructing requests with a fluent API
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    params: Params,
    body: Body,
    content_type: Option<String>,
}

impl RequestBuilder {
    /// Set the HTTP method (GET when unset)
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the resource path, e.g. `tweets/search/stream`
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Replace the query parameters
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Append values to one query parameter
    #[must_use]
    pub fn param<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.params.add(name, values);
        self
    }

    /// Set the body to a JSON-serialized value and its content type
    ///
    /// # Errors
    /// Returns a build error if the value cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = Body::from_json(value)?;
        self.content_type = Some(JSON_CONTENT_TYPE.to_owned());
        Ok(self)
    }

    /// Set the request body with an explicit content type
    #[must_use]
    pub fn body<B: Into<Body>>(mut self, body: B, content_type: impl Into<String>) -> Self {
        self.body = body.into();
        self.content_type = Some(content_type.into());
        self
    }

    /// Build the request
    ///
    /// # Errors
    /// Returns a build error if no path was given.
    pub fn build(self) -> Result<Request> {
        let method = self.method.unwrap_or(Method::GET);
        let path = self
            .path
            .filter(|p| !p.trim_matches('/').is_empty())
            .ok_or_else(|| Error::build("request path is required"))?;

        Ok(Request {
            method,
            path,
            params: self.params,
            body: self.body,
            content_type: self.content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_defaults_to_get() {
        let req = Request::builder().path("users/by/username/jack").build().unwrap();
        assert_eq!(req.method(), &Method::GET);
        assert!(req.body().is_empty());
        assert!(req.content_type().is_none());
    }

    #[test]
    fn test_path_is_required() {
        let err = Request::builder().build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Build);

        let err = Request::builder().path("/").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Build);
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let req = Request::builder()
            .method(Method::POST)
            .path("tweets/search/stream/rules")
            .param("dry_run", ["true"])
            .json(&json!({"delete": {"ids": ["1"]}}))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.content_type(), Some("application/json"));
        assert_eq!(req.params().get("dry_run").unwrap(), ["true".to_owned()]);
        assert!(!req.body().is_empty());
    }
}
