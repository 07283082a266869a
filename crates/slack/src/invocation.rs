use std::sync::Arc;

use async_trait::async_trait;
use slashkit_core::domain::request::CommandRequest;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::TokenValidator;
use crate::capture::{CommandOutput, HandlerOutcome, OutputCapture};
use crate::dispatch::{DeliveryReport, ResponseDispatcher};

/// Application logic behind one slash command.
///
/// Anything written to `output.broadcast()` is posted to the channel, anything
/// written to `output.private()` is shown only to the caller. Returning an
/// error reports its description privately; output already written is still
/// delivered.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        request: &CommandRequest,
        output: &mut CommandOutput,
    ) -> anyhow::Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvocationOutcome {
    Completed,
    Unauthenticated { description: String },
    HandlerFailed { description: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationReport {
    pub correlation_id: String,
    pub outcome: InvocationOutcome,
    pub delivery: DeliveryReport,
}

/// Authenticates `request`, runs `handler` with captured output and posts
/// the result to the request's callback URL.
///
/// Never fails: authentication errors, handler errors and delivery failures
/// all end up in the returned report, the log, and (where possible) a
/// private message to the caller.
pub async fn run_invocation(
    validator: &TokenValidator,
    handler: Arc<dyn CommandHandler>,
    dispatcher: &ResponseDispatcher,
    request: CommandRequest,
) -> InvocationReport {
    let correlation_id = Uuid::new_v4().to_string();
    let request = Arc::new(request);

    info!(
        event_name = "invocation.request.received",
        correlation_id = %correlation_id,
        command = %request.command,
        user_id = %request.user_id,
        channel_id = %request.channel_id,
        request = %serde_json::to_string(&request.redacted()).unwrap_or_default(),
        "slash command received"
    );

    let (captured, outcome) = match validator.validate(request.token.as_deref()) {
        Ok(()) => {
            let (captured, outcome) =
                OutputCapture::run(handler, request.clone(), &correlation_id).await;
            let outcome = match outcome {
                HandlerOutcome::Completed => InvocationOutcome::Completed,
                HandlerOutcome::Failed { description } => {
                    InvocationOutcome::HandlerFailed { description }
                }
            };
            (captured, outcome)
        }
        Err(auth_error) => {
            let description = auth_error.to_string();
            error!(
                event_name = "invocation.request.unauthenticated",
                correlation_id = %correlation_id,
                command = %request.command,
                user_id = %request.user_id,
                error = %description,
                "slash command rejected"
            );
            let mut output = CommandOutput::default();
            output.eprintln(&description);
            (output.into_captured(), InvocationOutcome::Unauthenticated { description })
        }
    };

    let delivery = dispatcher.deliver(&request, captured).await;

    info!(
        event_name = "invocation.request.completed",
        correlation_id = %correlation_id,
        command = %request.command,
        broadcast_delivered = ?delivery.broadcast,
        private_delivered = ?delivery.private,
        "slash command completed"
    );

    InvocationReport { correlation_id, outcome, delivery }
}

/// Bundles the collaborators of [`run_invocation`] for hosts that serve a
/// single command. Cheap to clone.
#[derive(Clone)]
pub struct CommandRunner {
    validator: TokenValidator,
    handler: Arc<dyn CommandHandler>,
    dispatcher: ResponseDispatcher,
}

impl CommandRunner {
    pub fn new(
        validator: TokenValidator,
        handler: Arc<dyn CommandHandler>,
        dispatcher: ResponseDispatcher,
    ) -> Self {
        Self { validator, handler, dispatcher }
    }

    pub async fn run(&self, request: CommandRequest) -> InvocationReport {
        run_invocation(&self.validator, self.handler.clone(), &self.dispatcher, request).await
    }
}
