//! Raw payloads supplied by the data source
//!
//! The pipeline never performs I/O. A data source hands it a [`RawPayloads`]
//! map of function name -> decoded JSON document, where a failed request is
//! recorded as the sentinel `{"error": "<message>"}`.

use crate::error::{MetricsError, Result};
use hashbrown::HashMap;
use serde_json::{json, Value};
use std::path::Path;

/// Key of the error sentinel object
pub const ERROR_KEY: &str = "error";

/// Top-level keys a provider uses for error, rate-limit and notice bodies
const PROVIDER_NOTICE_KEYS: [&str; 3] = ["Error Message", "Information", "Note"];

/// Error message carried by a `{"error": ...}` sentinel, if `value` is one
pub fn error_sentinel(value: &Value) -> Option<&str> {
    value
        .as_object()
        .and_then(|obj| obj.get(ERROR_KEY))
        .map(|msg| msg.as_str().unwrap_or("unknown error"))
}

/// Detect provider bodies that carry no data (error messages, rate-limit
/// notices, empty objects)
fn provider_error(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    if obj.is_empty() {
        return Some("empty response".to_string());
    }
    if !obj.keys().all(|k| PROVIDER_NOTICE_KEYS.contains(&k.as_str())) {
        return None;
    }
    let message = PROVIDER_NOTICE_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .unwrap_or("provider returned no data");
    Some(message.to_string())
}

/// Function name -> decoded response, as supplied by the data source
#[derive(Debug, Clone, Default)]
pub struct RawPayloads {
    payloads: HashMap<String, Value>,
}

impl RawPayloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document as-is
    pub fn insert(&mut self, function: impl Into<String>, payload: Value) {
        self.payloads.insert(function.into(), payload);
    }

    /// Record a failed request
    pub fn insert_error(&mut self, function: impl Into<String>, message: impl Into<String>) {
        let message: String = message.into();
        self.payloads
            .insert(function.into(), json!({ ERROR_KEY: message }));
    }

    /// Store a provider response, turning data-less error bodies into the
    /// error sentinel
    pub fn insert_response(&mut self, function: impl Into<String>, payload: Value) {
        let function = function.into();
        match provider_error(&payload) {
            Some(message) => {
                log::warn!("{} returned no data: {}", function, message);
                self.insert_error(function, message);
            }
            None => self.insert(function, payload),
        }
    }

    /// Usable payload for `function`; `None` when missing or errored
    pub fn get(&self, function: &str) -> Option<&Value> {
        self.payloads
            .get(function)
            .filter(|payload| error_sentinel(payload).is_none())
    }

    /// Error message recorded for `function`, if any
    pub fn error(&self, function: &str) -> Option<&str> {
        self.payloads.get(function).and_then(error_sentinel)
    }

    pub fn contains(&self, function: &str) -> bool {
        self.payloads.contains_key(function)
    }

    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.payloads.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

impl FromIterator<(String, Value)> for RawPayloads {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut payloads = Self::new();
        for (function, payload) in iter {
            payloads.insert_response(function, payload);
        }
        payloads
    }
}

/// Load `<dir>/<FUNCTION>.json` for every function.
///
/// Unreadable or malformed files are recorded as error sentinels; only a
/// missing directory fails the load.
pub fn load_payload_dir(dir: impl AsRef<Path>, functions: &[&str]) -> Result<RawPayloads> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(MetricsError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Payload directory not found: {}", dir.display()),
        )));
    }

    let mut payloads = RawPayloads::new();
    for function in functions {
        let path = dir.join(format!("{}.json", function));

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("Cannot read {}: {}", path.display(), e);
                payloads.insert_error(*function, format!("read failed: {}", e));
                continue;
            }
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(payload) => payloads.insert_response(*function, payload),
            Err(e) => {
                log::warn!("Invalid JSON in {}: {}", path.display(), e);
                payloads.insert_error(*function, format!("invalid JSON: {}", e));
            }
        }
    }

    log::debug!(
        "Loaded {} payloads from {}",
        payloads.len(),
        dir.display()
    );
    Ok(payloads)
}
