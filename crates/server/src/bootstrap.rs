use std::sync::Arc;

use slashkit_core::config::{AppConfig, ConfigError};
use slashkit_slack::dispatch::TransportError;
use slashkit_slack::{
    CommandHandler, CommandRunner, HttpResponseTransport, ResponseDispatcher, TokenValidator,
};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub runner: CommandRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("callback transport could not be created: {0}")]
    Transport(#[source] TransportError),
}

pub fn bootstrap_with_config(
    config: AppConfig,
    handler: Arc<dyn CommandHandler>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.validate()?;

    let validator = TokenValidator::from_config(&config.slack);
    if validator.is_open() {
        warn!(
            event_name = "system.bootstrap.open_mode",
            correlation_id = "bootstrap",
            "no verification token configured; every request will be accepted"
        );
    }

    let transport =
        HttpResponseTransport::from_config(&config.dispatch).map_err(BootstrapError::Transport)?;
    let dispatcher = ResponseDispatcher::new(Arc::new(transport));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        command_path = %config.server.command_path,
        "command runner initialized"
    );

    Ok(Application { runner: CommandRunner::new(validator, handler, dispatcher), config })
}
