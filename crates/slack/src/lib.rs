//! Slash-command plumbing for slashkit.
//!
//! - **Arguments** (`args`) - shell-like tokenizer for the command text
//! - **Authentication** (`auth`) - shared verification token check
//! - **Capture** (`capture`) - per-invocation broadcast/private output sinks
//! - **Dispatch** (`dispatch`) - posts responses to the request's `response_url`
//! - **Invocation** (`invocation`) - `CommandHandler` trait and the orchestration
//!   that ties the pieces together
//!
//! # Architecture
//!
//! ```text
//! CommandRequest → TokenValidator → OutputCapture(CommandHandler)
//!                                          ↓
//!                  response_url ← ResponseDispatcher (in_channel, then ephemeral)
//! ```

pub mod args;
pub mod auth;
pub mod capture;
pub mod dispatch;
pub mod invocation;

pub use args::tokenize;
pub use auth::{AuthenticationError, TokenValidator};
pub use capture::{CapturedOutput, CommandOutput, OutputCapture, OutputSink};
pub use dispatch::{
    DeliveryReport, DispatchError, HttpResponseTransport, ResponseDispatcher, ResponseTransport,
};
pub use invocation::{
    run_invocation, CommandHandler, CommandRunner, InvocationOutcome, InvocationReport,
};
