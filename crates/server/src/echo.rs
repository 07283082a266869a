use std::fmt::Write as _;

use async_trait::async_trait;
use slashkit_core::domain::request::CommandRequest;
use slashkit_slack::{tokenize, CommandHandler, CommandOutput};

/// Sample command: repeats the caller's arguments back to the channel.
pub struct EchoCommand;

#[async_trait]
impl CommandHandler for EchoCommand {
    async fn handle(
        &self,
        request: &CommandRequest,
        output: &mut CommandOutput,
    ) -> anyhow::Result<()> {
        let arguments = tokenize(&request.text);
        if arguments.is_empty() {
            writeln!(output.private(), "Usage: {} <word> [\"quoted words\" ...]", request.command)?;
            return Ok(());
        }

        writeln!(output.broadcast(), "{} says:", display_name(request))?;
        for argument in &arguments {
            writeln!(output.broadcast(), "• {argument}")?;
        }
        Ok(())
    }
}

fn display_name(request: &CommandRequest) -> &str {
    if request.user_name.is_empty() {
        "someone"
    } else {
        &request.user_name
    }
}
