use barker_api::api::{TaskEntry, DEFAULT_METHODS};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Errors that can occur when loading the task file.
///
/// All of them are fatal, see [`fatal`].
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read task file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid task file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no command specified for task '{task}'")]
    MissingCommand { task: String },
}

/// A task as loaded from the task file, immutable once loaded.
#[derive(Debug)]
pub struct Task {
    pub name: String,
    pub command: String,
    pub directory: Option<PathBuf>,
    pub accepts_payload: bool,
    allowed_methods: HashSet<String>,
}

impl Task {
    /// Case-sensitive, `get` does not match `GET`.
    pub fn allows(&self, method: &str) -> bool {
        self.allowed_methods.contains(method)
    }
}

/// The tasks of one task file.
#[derive(Debug)]
pub struct TaskRegistry {
    file: PathBuf,
    tasks: HashMap<String, Arc<Task>>,
}

impl TaskRegistry {
    pub async fn load(file: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let file = file.into();
        let contents = tokio::fs::read_to_string(&file)
            .await
            .map_err(|source| RegistryError::Read {
                path: file.clone(),
                source,
            })?;
        Self::from_json(file, &contents)
    }

    /// Loads a fresh registry from the same file.
    pub async fn reload(&self) -> Result<Self, RegistryError> {
        Self::load(&self.file).await
    }

    /// Parses `contents` as if read from `file`.
    pub fn from_json(file: impl Into<PathBuf>, contents: &str) -> Result<Self, RegistryError> {
        let file = file.into();
        let parse_error = |source| RegistryError::Parse {
            path: file.clone(),
            source,
        };
        let entries: HashMap<String, Value> =
            serde_json::from_str(contents).map_err(parse_error)?;

        let mut tasks = HashMap::with_capacity(entries.len());
        for (name, entry) in entries {
            let entry: TaskEntry =
                serde_json::from_value(canonical_fields(entry)).map_err(parse_error)?;
            if entry.command.is_empty() {
                return Err(RegistryError::MissingCommand { task: name });
            }
            let allowed_methods = if entry.methods.is_empty() {
                DEFAULT_METHODS.iter().map(|m| String::from(*m)).collect()
            } else {
                entry.methods.into_iter().collect()
            };
            let task = Task {
                name: name.clone(),
                command: entry.command,
                directory: (!entry.directory.is_empty()).then(|| PathBuf::from(entry.directory)),
                accepts_payload: entry.payload,
                allowed_methods,
            };
            tasks.insert(name, Arc::new(task));
        }

        Ok(Self { file, tasks })
    }

    pub fn get(&self, name: &str) -> Option<Arc<Task>> {
        self.tasks.get(name).cloned()
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Sorted task names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

const FIELDS: [&str; 4] = ["Cmd", "Dir", "Payload", "Methods"];

/// Renames task fields matching [`FIELDS`] case-insensitively to their canonical spelling.
///
/// An exact spelling wins over other casings of the same field.
fn canonical_fields(entry: Value) -> Value {
    let Value::Object(fields) = entry else {
        return entry;
    };
    let mut canonical = Map::with_capacity(fields.len());
    for (key, value) in fields {
        match FIELDS.iter().find(|field| field.eq_ignore_ascii_case(&key)) {
            Some(field) if *field == key => {
                canonical.insert(key, value);
            }
            Some(field) => {
                canonical.entry(*field).or_insert(value);
            }
            None => {
                canonical.insert(key, value);
            }
        }
    }
    Value::Object(canonical)
}

/// The live registry, shared by all request handlers.
///
/// Readers clone the current snapshot and keep using it for the whole request,
/// a reload swaps in a new one. Nobody ever sees a half loaded table.
#[derive(Debug, Clone)]
pub struct SharedRegistry(Arc<RwLock<Arc<TaskRegistry>>>);

impl SharedRegistry {
    pub fn new(registry: TaskRegistry) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(registry))))
    }

    pub fn snapshot(&self) -> Arc<TaskRegistry> {
        // The lock only guards a pointer swap, a poisoned value is still consistent.
        Arc::clone(&self.0.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn replace(&self, registry: TaskRegistry) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(registry);
    }

    /// Reloads the task file of the current snapshot and swaps the result in.
    pub async fn reload(&self) -> Result<(), RegistryError> {
        let fresh = self.snapshot().reload().await?;
        log::info!(tasks = fresh.len(); "reloaded tasks");
        self.replace(fresh);
        Ok(())
    }
}

/// Terminates the process on an invalid task file.
///
/// Serving with a partial or stale table is worse than not serving at all.
pub fn fatal(error: &RegistryError) -> ! {
    log::error!("{error}");
    std::process::exit(1)
}
