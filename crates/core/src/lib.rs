pub mod config;
pub mod domain;

pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::request::{CallbackUrlError, CommandRequest, REDACTED_TOKEN};
pub use domain::response::{Attachment, ResponseMessage, ResponseType};
