use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::auth::Authorizer;
use crate::body::BodyStream;
use crate::config::{API_VERSION, ClientConfig, DEFAULT_BASE_URL};
use crate::error::{BoxError, Error, Result};
use crate::log::{Diagnostics, TAG_REQUEST_URL};
use crate::rate_limit::RateLimit;
use crate::reply::Reply;
use crate::request::Request;
use crate::response::Response;
use crate::stream;

/// Session for the versioned API.
///
/// Cheap to clone; clones share the connection pool. Each call or stream is
/// independent, so many may run concurrently on one client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Option<String>,
    timeout: Option<Duration>,
    authorizer: Option<Authorizer>,
    diag: Diagnostics,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url())
            .field("timeout", &self.timeout)
            .field("authorizer", &self.authorizer.is_some())
            .field("diag", &self.diag)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create client from configuration
    ///
    /// # Errors
    /// Returns a build error if no HTTP client was supplied and one cannot
    /// be constructed.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let http = match config.http_client {
            Some(http) => http,
            None => reqwest::Client::builder()
                .build()
                .map_err(|e| Error::build("building HTTP client").with_source(e))?,
        };

        Ok(Self {
            http,
            base_url: config.base_url,
            timeout: config.timeout,
            authorizer: config.authorizer,
            diag: Diagnostics::new(config.log),
        })
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Issue one request and decode the response envelope.
    ///
    /// The returned [`Reply`] carries the rate-limit counters reported by
    /// the server, when present.
    ///
    /// # Errors
    /// - [`ErrorKind::Build`](crate::ErrorKind::Build) if the URL or body cannot be assembled
    /// - [`ErrorKind::Authorization`](crate::ErrorKind::Authorization) if the authorizer fails
    /// - [`ErrorKind::Transport`](crate::ErrorKind::Transport) if the exchange does not complete
    /// - [`ErrorKind::Cancelled`](crate::ErrorKind::Cancelled) if `cancel` fires first
    /// - [`ErrorKind::Status`](crate::ErrorKind::Status) for any status but 200 and 201
    /// - [`ErrorKind::Decode`](crate::ErrorKind::Decode) if the body is not a JSON envelope
    pub async fn call(&self, cancel: &CancellationToken, request: &Request) -> Result<Reply> {
        let (body, rate_limit) = cancellable(cancel, self.fetch(request)).await?;
        let mut reply = Reply::from_slice(&body, "decoding response body")?;
        reply.rate_limit = rate_limit;
        Ok(reply)
    }

    /// Issue one request and return the undecoded response body.
    ///
    /// # Errors
    /// As [`Client::call`], except that the body is never decoded.
    pub async fn call_raw(&self, cancel: &CancellationToken, request: &Request) -> Result<Bytes> {
        let (body, _) = cancellable(cancel, self.fetch(request)).await?;
        Ok(body)
    }

    /// Issue one request whose response is a long-lived stream of JSON
    /// messages, handing each decoded message to `callback` in order.
    ///
    /// Returns `Ok(())` when the server ends the stream, when the callback
    /// returns [`StopStreaming`](crate::StopStreaming), or when `cancel`
    /// fires (including before the request is issued). No timeout applies.
    ///
    /// # Errors
    /// - the request errors of [`Client::call`], apart from cancellation
    /// - [`ErrorKind::Decode`](crate::ErrorKind::Decode) for a malformed message, with its bytes
    /// - [`ErrorKind::Transport`](crate::ErrorKind::Transport) if reading the body fails
    /// - [`ErrorKind::Callback`](crate::ErrorKind::Callback) wrapping any other callback error
    pub async fn stream<F>(
        &self,
        cancel: &CancellationToken,
        request: &Request,
        callback: F,
    ) -> Result<()>
    where
        F: FnMut(Reply) -> Result<(), BoxError> + Send,
    {
        if cancel.is_cancelled() {
            tracing::debug!(path = request.path(), "stream cancelled before request");
            return Ok(());
        }

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            body = self.open_stream(request) => Some(body),
        };
        let Some(body) = opened.transpose()? else {
            tracing::debug!(path = request.path(), "stream cancelled while connecting");
            return Ok(());
        };

        stream::run(cancel, body, &self.diag, callback).await?;
        Ok(())
    }

    /// Blocking version of [`Client::call`] for sync contexts (e.g. build scripts)
    ///
    /// Runs on a private current-thread runtime.
    ///
    /// # Errors
    /// As [`Client::call`]; also a build error if invoked from inside an
    /// async runtime.
    pub fn call_blocking(&self, cancel: &CancellationToken, request: &Request) -> Result<Reply> {
        block_on(self.call(cancel, request))
    }

    /// Blocking version of [`Client::call_raw`]
    ///
    /// # Errors
    /// As [`Client::call_blocking`].
    pub fn call_raw_blocking(&self, cancel: &CancellationToken, request: &Request) -> Result<Bytes> {
        block_on(self.call_raw(cancel, request))
    }

    async fn fetch(&self, request: &Request) -> Result<(Bytes, Option<RateLimit>)> {
        let mut rsp = self.start(request, self.timeout).await?;
        let body = rsp.receive(&self.diag).await?;
        Ok((body, RateLimit::from_headers(rsp.headers())))
    }

    async fn open_stream(&self, request: &Request) -> Result<BodyStream> {
        let rsp = self.start(request, None).await?;
        rsp.open(&self.diag).await
    }

    async fn start(&self, request: &Request, timeout: Option<Duration>) -> Result<Response> {
        let req = self.build_request(request, timeout)?;
        let url = req.url().to_string();
        self.diag.emit(TAG_REQUEST_URL, &url);
        tracing::debug!(method = %req.method(), %url, "issuing request");

        let rsp = self
            .http
            .execute(req)
            .await
            .map_err(|e| Error::transport("issuing request", e))?;
        Ok(Response::from_reqwest(rsp))
    }

    /// Shape the outbound request; the authorizer runs last.
    fn build_request(&self, request: &Request, timeout: Option<Duration>) -> Result<reqwest::Request> {
        let url = self.endpoint(request)?;
        let mut req = reqwest::Request::new(request.method().clone(), url);
        *req.timeout_mut() = timeout;

        if let Some(bytes) = request.body().clone().into_bytes() {
            if let Some(content_type) = request.content_type() {
                let value = HeaderValue::try_from(content_type)
                    .map_err(|e| Error::build("invalid content type").with_source(e))?;
                req.headers_mut().insert(CONTENT_TYPE, value);
            }
            *req.body_mut() = Some(reqwest::Body::from(bytes));
        }

        if let Some(authorize) = &self.authorizer {
            authorize(&mut req).map_err(Error::authorization)?;
        }
        Ok(req)
    }

    /// `{base}/2/{path}?{params}`
    fn endpoint(&self, request: &Request) -> Result<Url> {
        let raw = format!(
            "{}/{API_VERSION}/{}",
            self.base_url().trim_end_matches('/'),
            request.path().trim_start_matches('/')
        );
        let mut url =
            Url::parse(&raw).map_err(|e| Error::build("invalid request URL").with_source(e))?;
        if url.cannot_be_a_base() {
            return Err(Error::build("invalid request URL"));
        }

        let pairs = request.params().encode();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }
}

/// Race `fut` against `cancel`, checking the token before starting.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    if cancel.is_cancelled() {
        return Err(Error::cancelled());
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::cancelled()),
        out = fut => out,
    }
}

fn block_on<T>(fut: impl Future<Output = Result<T>>) -> Result<T> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(Error::build(
            "blocking call made from inside an async runtime",
        ));
    }
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::build("starting blocking runtime").with_source(e))?
        .block_on(fut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authorizer;
    use crate::error::ErrorKind;
    use http::Method;
    use serde_json::json;

    fn client(config: ClientConfig) -> Client {
        Client::from_config(config).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client(ClientConfig::default());
        assert_eq!(client.base_url(), "https://api.twitter.com");
    }

    #[test]
    fn test_endpoint_default_base() {
        let client = client(ClientConfig::default());
        let req = Request::get("tweets/search/stream");
        let url = client.endpoint(&req).unwrap();
        assert_eq!(url.as_str(), "https://api.twitter.com/2/tweets/search/stream");
    }

    #[test]
    fn test_endpoint_joins_slashes_and_params() {
        let client = client(ClientConfig::default().with_base_url("http://localhost:8080/"));
        let req = Request::builder()
            .path("/users")
            .param("ids", ["1", "2"])
            .param("user.fields", ["created_at"])
            .build()
            .unwrap();
        let url = client.endpoint(&req).unwrap();
        assert_eq!(url.path(), "/2/users");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("ids".to_owned(), "1,2".to_owned()),
                ("user.fields".to_owned(), "created_at".to_owned()),
            ]
        );
    }

    #[test]
    fn test_invalid_base_url_is_build_error() {
        let client = client(ClientConfig::default().with_base_url("not a url"));
        let err = client.endpoint(&Request::get("ping")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Build);
        assert_eq!(err.message(), "invalid request URL");
    }

    #[test]
    fn test_authorizer_sees_shaped_request() {
        let config = ClientConfig::default().with_authorizer(authorizer(|req| {
            let ct = req
                .headers()
                .get(CONTENT_TYPE)
                .ok_or("content type not set before authorizing")?;
            assert_eq!(ct, "application/json");
            assert!(req.body().is_some());
            assert_eq!(req.url().query(), Some("dry_run=true"));
            Ok(())
        }));
        let req = Request::builder()
            .method(Method::POST)
            .path("tweets/search/stream/rules")
            .param("dry_run", ["true"])
            .json(&json!({"add": [{"value": "cat has:images"}]}))
            .unwrap()
            .build()
            .unwrap();

        let built = client(config).build_request(&req, None).unwrap();
        assert_eq!(built.method(), &Method::POST);
        assert!(built.timeout().is_none());
    }

    #[test]
    fn test_empty_body_sends_no_content_type() {
        let client = client(ClientConfig::default());
        let req = Request::builder()
            .method(Method::POST)
            .path("tweets/search/stream/rules")
            .body("", "text/plain")
            .build()
            .unwrap();

        let built = client.build_request(&req, None).unwrap();
        assert!(built.headers().get(CONTENT_TYPE).is_none());
        assert!(built.body().is_none());
    }

    #[test]
    fn test_authorizer_failure_aborts() {
        let config = ClientConfig::default().with_authorizer(authorizer(|_| Err("token expired".into())));
        let err = client(config)
            .build_request(&Request::get("ping"), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(err.to_string(), "attaching authorization");
        assert_eq!(
            std::error::Error::source(&err).unwrap().to_string(),
            "token expired"
        );
    }

    #[test]
    fn test_timeout_applies_per_request() {
        let client = client(ClientConfig::default().with_timeout(Duration::from_secs(5)));
        let req = client
            .build_request(&Request::get("ping"), client.timeout)
            .unwrap();
        assert_eq!(req.timeout(), Some(&Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_blocking_inside_runtime_is_rejected() {
        let client = client(ClientConfig::default());
        let err = client
            .call_blocking(&CancellationToken::new(), &Request::get("ping"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Build);
    }

    #[tokio::test]
    async fn test_cancelled_call_is_not_issued() {
        let client = client(ClientConfig::default().with_base_url("http://127.0.0.1:9"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client.call(&cancel, &Request::get("ping")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }
}
