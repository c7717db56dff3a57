use crate::context::RequestContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-keyed map of arbitrary JSON values.
pub type ContextMap = BTreeMap<String, serde_json::Value>;

/// Ambient request/process state at the moment an event was logged.
///
/// All six sections are always present. A section whose source had no data
/// (no session, no uploads, ...) is an empty map, never missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub get: ContextMap,
    pub post: ContextMap,
    pub server: ContextMap,
    pub files: ContextMap,
    pub cookies: ContextMap,
    pub session: ContextMap,
}

impl EnvironmentSnapshot {
    /// Read every section from `context`. Read-only; nothing is cached.
    pub fn capture(context: &dyn RequestContext) -> Self {
        EnvironmentSnapshot {
            get: context.query().unwrap_or_default(),
            post: context.form().unwrap_or_default(),
            server: context.server().unwrap_or_default(),
            files: context.files().unwrap_or_default(),
            cookies: context.cookies().unwrap_or_default(),
            session: context.session().unwrap_or_default(),
        }
    }
}
