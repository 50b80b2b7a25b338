//! Command dispatch: bridges CLI args -> core Controller -> output formatting.

pub mod analytics;
pub mod config_cmd;
pub mod pump;
pub mod watch;

use soilwatch_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a relay-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(controller, args, global).await,
        Command::Pump(args) => pump::handle(controller, args, global).await,
        Command::Analytics(args) => analytics::handle(controller, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions do not talk to the relay".into(),
        )),
    }
}
