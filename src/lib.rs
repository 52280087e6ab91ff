//! This crate describes the contract of the barker task runner:
//! the task file the server loads and the payload a task receives.
//! The server itself lives in the `barker-server` crate of the same repository.
//!
//! barker maps http paths to preconfigured commands, e.g. to trigger a
//! deployment from a webhook without giving the caller a shell.
//!
//! ## Usage
//! The task file is a json object of [`api::TaskEntry`] values keyed by task name.
//! * `<any method> /__reload__` rereads the task file, see [`api::RELOAD_PATH`].
//! * `<method> /{name}` runs the task `name` if it accepts `method`.
//!   Responds `200 OK` on exit code zero and `502` otherwise.
//! * Unknown tasks yield `404`, disallowed methods `405`.
//!
//! ## Payload
//! A task with `"Payload": true` receives the request's form fields as an
//! [`api::Payload`] json object on stdin. The query string and, for
//! url-encoded `POST`, `PUT` and `PATCH` requests, the body are both parsed.
//!
//! ## Long running jobs
//! The http call waits until the command terminates, there is no timeout.
//! *Make sure your commands always terminate* in order to not lock up valuable resources.
//!
//! ## Security
//! A single shared credential can be configured, compared against the second token
//! of the `Authorization` header. Without it, *anyone* who can reach the server
//! can run the configured tasks. Terminate TLS in front of it.

pub mod api;
