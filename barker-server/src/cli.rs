use clap::{Parser, ValueHint};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Runs preconfigured commands on http requests.")]
pub struct CliArgs {
    /// Shared secret expected as the second token of the `Authorization` header.
    /// Empty disables authentication.
    #[arg(
        long,
        value_name = "CREDENTIAL",
        default_value = "",
        hide_default_value = true,
        hide_env_values = true,
        env = "BARKER_AUTH"
    )]
    pub auth: String,
    /// The address to listen on: `:PORT`, `PORT` or `HOST:PORT`.
    #[arg(
        short,
        long,
        value_name = "ADDR",
        value_hint = ValueHint::Other,
        default_value = ":8080",
        env = "BARKER_PORT",
    )]
    pub port: String,
    /// The json task file, reread on `/__reload__`.
    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        default_value = "./tasks.json",
        env = "BARKER_TASKS",
    )]
    pub tasks: PathBuf,
}

/// Expands the `--port` value to a bindable address, a missing host means all interfaces.
pub fn listen_address(port: &str) -> String {
    if let Some(port) = port.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
        format!("0.0.0.0:{port}")
    } else {
        port.to_owned()
    }
}
