use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The version of the task file and payload format.
pub const VERSION: &str = "1.0";

/// Requesting this path (with any method) reloads the task file.
///
/// A task with the same name can never be invoked, the reload takes precedence.
pub const RELOAD_PATH: &str = "__reload__";

/// The methods a task accepts if its entry does not list any.
pub const DEFAULT_METHODS: &[&str] = &["GET"];

/// Response body of a reload or a successful task.
pub const OK_BODY: &str = "OK";
pub const NOT_FOUND_BODY: &str = "Not found.";
pub const METHOD_NOT_ALLOWED_BODY: &str = "Method Not Allowed";
pub const TASK_FAILED_BODY: &str = "Cannot perform task.";
pub const UNAUTHORIZED_BODY: &str = "Unauthorized.";

/// Value of the `WWW-Authenticate` header sent along with a `401`.
pub const AUTH_CHALLENGE: &str = r#"Basic realm="user""#;

/// A single task as written in the task file.
///
/// The server matches the field names case-insensitively,
/// `CMD` and `cmd` both set [`TaskEntry::command`].
///
/// # Serialized Example
/// ```
/// # let ser = r#"
/// {
///     "Cmd": "/usr/local/bin/deploy",
///     "Dir": "/srv/app",
///     "Payload": true,
///     "Methods": ["POST"]
/// }
/// # "#;
/// # let entry: barker_api::api::TaskEntry
/// #    = serde_json::from_str(ser).expect("failed parsing");
/// # assert_eq!(entry.command, "/usr/local/bin/deploy");
/// # assert!(entry.payload);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    /// The executable, called without arguments. Must not be empty.
    #[serde(rename = "Cmd", default)]
    pub command: String,
    /// Working directory of the command. Empty means the server's working directory.
    #[serde(rename = "Dir", default)]
    pub directory: String,
    /// Whether the request form data is written to the command's stdin.
    #[serde(rename = "Payload", default)]
    pub payload: bool,
    /// Accepted HTTP methods, compared case-sensitively. Empty means [`DEFAULT_METHODS`].
    #[serde(rename = "Methods", default)]
    pub methods: Vec<String>,
}

/// The json object a task with `Payload` enabled receives on stdin.
///
/// Every form field maps to *all* of its values, so single values are still
/// one-element arrays. Keys are sorted.
///
/// # Serialized Example
/// ```
/// # let ser = r#"
/// {
///     "branch": ["main"],
///     "tag": ["v1", "latest"]
/// }
/// # "#;
/// # let payload: barker_api::api::Payload
/// #    = serde_json::from_str(ser).expect("failed parsing");
/// # assert_eq!(payload["tag"].len(), 2);
/// ```
pub type Payload = BTreeMap<String, Vec<String>>;

/// Collects decoded form pairs into a [`Payload`], keeping the order of values per key.
pub fn collect_payload<I, K, V>(pairs: I) -> Payload
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut payload = Payload::new();
    for (key, value) in pairs {
        payload.entry(key.into()).or_default().push(value.into());
    }
    payload
}
