//! Execution context for workflow runs
//!
//! A `WorkflowContext` is the shared namespace of a single run: every
//! component's declared outputs land here under their default or aliased
//! keys, and later instances resolve `{{key}}` placeholders against it.
//! One context exists per one-shot execution or per triggered listener
//! invocation; it is never shared across concurrent runs.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::placeholder::PLACEHOLDER_REGEX;
use crate::engine::error::EngineError;

/// Thread-safe key/value store for a single workflow run.
///
/// A single mutex guards the data; `resolve` holds it for the whole
/// substitution so a template always observes a consistent snapshot, even
/// with listener callbacks writing from another task.
#[derive(Debug)]
pub struct WorkflowContext {
    run_id: String,
    started_at: DateTime<Utc>,
    data: Mutex<HashMap<String, String>>,
}

impl WorkflowContext {
    /// Create a fresh context with a generated run ID.
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            data: Mutex::new(HashMap::new()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Store a value under an output key.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        let mut data = self.data.lock().unwrap();
        data.insert(key.to_string(), value.into());
    }

    /// Fetch a value by key.
    pub fn get(&self, key: &str) -> Option<String> {
        let data = self.data.lock().unwrap();
        data.get(key).cloned()
    }

    /// Store several values at once.
    pub fn seed(&self, values: HashMap<String, String>) {
        let mut data = self.data.lock().unwrap();
        data.extend(values);
    }

    /// Substitute every `{{key}}` occurrence in the template with the current
    /// value of `key`. Fails if any referenced key is absent.
    pub fn resolve(&self, template: &str) -> Result<String, EngineError> {
        let data = self.data.lock().unwrap();
        let mut result = template.to_string();

        for cap in PLACEHOLDER_REGEX.captures_iter(template) {
            let token = cap.get(0).unwrap().as_str();
            let key = cap.get(1).unwrap().as_str();

            let value = data
                .get(key)
                .ok_or_else(|| EngineError::UnresolvedPlaceholder(key.to_string()))?;
            result = result.replace(token, value);
        }

        Ok(result)
    }

    /// Resolve every value of a configuration map.
    pub fn resolve_map(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, EngineError> {
        let mut resolved = HashMap::with_capacity(config.len());
        for (key, value) in config {
            resolved.insert(key.clone(), self.resolve(value)?);
        }
        Ok(resolved)
    }

    /// Copy of all current key/value pairs.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.data.lock().unwrap().clone()
    }
}

impl Default for WorkflowContext {
    fn default() -> Self {
        Self::new()
    }
}
