use std::sync::Arc;

/// Caller-supplied observer for `(tag, message)` diagnostic events.
///
/// Tags emitted by the client:
///
/// - `RequestURL`: the request URL sent to the server
/// - `HTTPStatus`: the HTTP status line, e.g. `200 OK`
/// - `ResponseBody`: the body of a non-streaming response
/// - `StreamBody`: one message of a stream response
///
/// The hook is purely observational and cannot affect the call.
pub type LogHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

pub const TAG_REQUEST_URL: &str = "RequestURL";
pub const TAG_HTTP_STATUS: &str = "HTTPStatus";
pub const TAG_RESPONSE_BODY: &str = "ResponseBody";
pub const TAG_STREAM_BODY: &str = "StreamBody";

/// Optional hook with cheap checks so callers skip formatting when unset
#[derive(Clone, Default)]
pub(crate) struct Diagnostics {
    hook: Option<LogHook>,
}

impl Diagnostics {
    pub(crate) fn new(hook: Option<LogHook>) -> Self {
        Self { hook }
    }

    pub(crate) fn enabled(&self) -> bool {
        self.hook.is_some()
    }

    pub(crate) fn emit(&self, tag: &str, message: &str) {
        if let Some(hook) = &self.hook {
            hook(tag, message);
        }
    }

    pub(crate) fn emit_bytes(&self, tag: &str, data: &[u8]) {
        if self.enabled() {
            self.emit(tag, &String::from_utf8_lossy(data));
        }
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("hook", &self.hook.as_ref().map(|_| ".."))
            .finish()
    }
}
