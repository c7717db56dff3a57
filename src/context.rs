use crate::environment::ContextMap;
use crate::trace::{self, RawFrame};
use serde_json::Value;

/// Read-only accessors for whatever ambient state the host can offer.
///
/// Hosts embedding the logger in a request handler implement this over
/// their request type; everything defaults to "not available", which the
/// builder records as an empty string / empty map.
pub trait RequestContext: Send + Sync {
    /// URI of the request being served.
    fn request_uri(&self) -> Option<String> {
        None
    }

    /// Query-string parameters.
    fn query(&self) -> Option<ContextMap> {
        None
    }

    /// Form (body) parameters.
    fn form(&self) -> Option<ContextMap> {
        None
    }

    /// Process and request metadata (headers, environment, ...).
    fn server(&self) -> Option<ContextMap> {
        None
    }

    /// Uploaded-file descriptors.
    fn files(&self) -> Option<ContextMap> {
        None
    }

    fn cookies(&self) -> Option<ContextMap> {
        None
    }

    fn session(&self) -> Option<ContextMap> {
        None
    }

    /// Current call stack, innermost first.
    ///
    /// Frame zero must be the logging call itself; the builder discards it.
    fn call_stack(&self) -> Vec<RawFrame> {
        Vec::new()
    }
}

/// Context backed by values fixed at construction.
///
/// Useful for request handlers that already parsed their input, and for
/// tests that need a synthetic request and call stack.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    uri: Option<String>,
    query: ContextMap,
    form: ContextMap,
    server: ContextMap,
    files: ContextMap,
    cookies: ContextMap,
    session: ContextMap,
    call_stack: Vec<RawFrame>,
}

impl StaticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query.insert(key.into(), value);
        self
    }

    pub fn with_form(mut self, key: impl Into<String>, value: Value) -> Self {
        self.form.insert(key.into(), value);
        self
    }

    pub fn with_server(mut self, key: impl Into<String>, value: Value) -> Self {
        self.server.insert(key.into(), value);
        self
    }

    pub fn with_file(mut self, key: impl Into<String>, value: Value) -> Self {
        self.files.insert(key.into(), value);
        self
    }

    pub fn with_cookie(mut self, key: impl Into<String>, value: Value) -> Self {
        self.cookies.insert(key.into(), value);
        self
    }

    pub fn with_session(mut self, key: impl Into<String>, value: Value) -> Self {
        self.session.insert(key.into(), value);
        self
    }

    pub fn with_call_stack(mut self, frames: Vec<RawFrame>) -> Self {
        self.call_stack = frames;
        self
    }
}

fn non_empty(map: &ContextMap) -> Option<ContextMap> {
    if map.is_empty() {
        None
    } else {
        Some(map.clone())
    }
}

impl RequestContext for StaticContext {
    fn request_uri(&self) -> Option<String> {
        self.uri.clone()
    }

    fn query(&self) -> Option<ContextMap> {
        non_empty(&self.query)
    }

    fn form(&self) -> Option<ContextMap> {
        non_empty(&self.form)
    }

    fn server(&self) -> Option<ContextMap> {
        non_empty(&self.server)
    }

    fn files(&self) -> Option<ContextMap> {
        non_empty(&self.files)
    }

    fn cookies(&self) -> Option<ContextMap> {
        non_empty(&self.cookies)
    }

    fn session(&self) -> Option<ContextMap> {
        non_empty(&self.session)
    }

    fn call_stack(&self) -> Vec<RawFrame> {
        self.call_stack.clone()
    }
}

/// Context for code running outside any request.
///
/// `server` carries the process environment variables plus `argv` and
/// `pid`; the call stack is captured live. Everything request-shaped is
/// absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessContext;

impl RequestContext for ProcessContext {
    fn server(&self) -> Option<ContextMap> {
        let mut server: ContextMap = std::env::vars_os()
            .map(|(key, value)| {
                (
                    key.to_string_lossy().into_owned(),
                    Value::String(value.to_string_lossy().into_owned()),
                )
            })
            .collect();
        let argv: Vec<Value> = std::env::args_os()
            .map(|arg| Value::String(arg.to_string_lossy().into_owned()))
            .collect();
        server.insert("argv".to_string(), Value::Array(argv));
        server.insert("pid".to_string(), Value::from(std::process::id()));
        Some(server)
    }

    fn call_stack(&self) -> Vec<RawFrame> {
        trace::capture_stack(trace::LOGGER_ENTRY_FRAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn static_context_reports_missing_sections_as_none() {
        let context = StaticContext::new().with_cookie("theme", json!("dark"));
        assert!(context.session().is_none());
        assert!(context.request_uri().is_none());
        assert_eq!(context.cookies().unwrap()["theme"], json!("dark"));
    }

    #[test]
    fn process_context_has_server_metadata_only() {
        let context = ProcessContext;
        let server = context.server().unwrap();
        assert_eq!(server["pid"], json!(std::process::id()));
        assert!(server["argv"].is_array());
        assert!(context.request_uri().is_none());
        assert!(context.session().is_none());
    }
}
