//! Invocation-scoped output capture.
//!
//! A handler never writes to process-wide streams. Instead it receives a
//! [`CommandOutput`] holding two sinks: everything written to the broadcast
//! sink is posted to the whole channel, everything written to the private sink
//! is shown only to the invoking user. [`OutputCapture::run`] owns the sinks
//! for exactly one invocation and always hands them back, whatever the
//! handler did.

use std::any::Any;
use std::fmt::{self, Write as _};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use slashkit_core::domain::request::CommandRequest;
use slashkit_core::domain::response::Attachment;
use tracing::error;

use crate::invocation::CommandHandler;

/// One output channel: accumulated text plus any attachments queued for the
/// same message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputSink {
    text: String,
    attachments: Vec<Attachment>,
}

impl OutputSink {
    /// Appends `line` followed by a newline.
    pub fn line(&mut self, line: impl fmt::Display) {
        let _ = writeln!(self.text, "{line}");
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.attachments.is_empty()
    }

    fn into_message(self) -> CapturedMessage {
        CapturedMessage { text: self.text, attachments: self.attachments }
    }
}

impl fmt::Write for OutputSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.text.push_str(s);
        Ok(())
    }
}

/// The pair of sinks handed to a [`CommandHandler`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandOutput {
    broadcast: OutputSink,
    private: OutputSink,
}

impl CommandOutput {
    /// Informational channel, posted `in_channel`.
    pub fn broadcast(&mut self) -> &mut OutputSink {
        &mut self.broadcast
    }

    /// Diagnostic channel, posted `ephemeral`.
    pub fn private(&mut self) -> &mut OutputSink {
        &mut self.private
    }

    pub fn println(&mut self, line: impl fmt::Display) {
        self.broadcast.line(line);
    }

    pub fn eprintln(&mut self, line: impl fmt::Display) {
        self.private.line(line);
    }

    pub fn into_captured(self) -> CapturedOutput {
        CapturedOutput {
            broadcast: self.broadcast.into_message(),
            private: self.private.into_message(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapturedMessage {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl CapturedMessage {
    /// Empty messages are never dispatched.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.attachments.is_empty()
    }
}

/// Final contents of both sinks after an invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapturedOutput {
    pub broadcast: CapturedMessage,
    pub private: CapturedMessage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerOutcome {
    Completed,
    Failed { description: String },
}

pub struct OutputCapture;

impl OutputCapture {
    /// Runs `handler` against fresh sinks and returns what it wrote.
    ///
    /// A failing or panicking handler never propagates: its description is
    /// appended to the private sink and logged, and the outcome is reported
    /// as [`HandlerOutcome::Failed`]. The sinks are owned here rather than by
    /// the handler future, so output written before an error or a panic is
    /// kept. Dropping the returned future drops the handler with it.
    pub async fn run(
        handler: Arc<dyn CommandHandler>,
        request: Arc<CommandRequest>,
        correlation_id: &str,
    ) -> (CapturedOutput, HandlerOutcome) {
        let mut output = CommandOutput::default();
        let result = AssertUnwindSafe(handler.handle(&request, &mut output)).catch_unwind().await;

        let description = match result {
            Ok(Ok(())) => return (output.into_captured(), HandlerOutcome::Completed),
            Ok(Err(error)) => format!("{error:#}"),
            Err(payload) => format!("command handler panicked: {}", panic_message(payload)),
        };

        error!(
            event_name = "invocation.handler.failed",
            correlation_id = %correlation_id,
            command = %request.command,
            error = %description,
            "command handler failed"
        );
        output.eprintln(&description);

        (output.into_captured(), HandlerOutcome::Failed { description })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
