use axum::{extract::State, http::StatusCode, routing::post, Form, Router};
use slashkit_core::domain::request::CommandRequest;
use slashkit_slack::CommandRunner;

use crate::health;

#[derive(Clone)]
pub struct CommandState {
    runner: CommandRunner,
}

pub fn router(command_path: &str, runner: CommandRunner, verification_enabled: bool) -> Router {
    Router::new()
        .route(command_path, post(receive_command))
        .with_state(CommandState { runner })
        .merge(health::router(verification_enabled))
}

/// Acknowledges the command immediately; the result reaches the user through
/// the request's `response_url`.
pub async fn receive_command(
    State(state): State<CommandState>,
    Form(request): Form<CommandRequest>,
) -> StatusCode {
    let runner = state.runner.clone();
    tokio::spawn(async move {
        runner.run(request).await;
    });
    StatusCode::OK
}
