//! Slack slash command relay: immediate ack, background research, single
//! callback delivery.

pub mod command;
pub mod handler;
pub mod notifier;
pub mod server;
pub mod tasks;

#[cfg(test)]
mod test_support;

pub use command::{
    parse_slash_command, split_language_token, Command, CommandParseError, SlashCommandForm,
};
pub use handler::{natural_key, CommandHandler, CommandHandlerConfig, RelayError};
pub use notifier::{
    translate_report, AckMessage, DeliveryError, HttpResponseSink, OutboundMessage,
    ResponseSink, ResponseVisibility, TranslationError,
};
pub use server::{build_relay_router, run_relay_server, HEALTH_ENDPOINT, SLACK_COMMANDS_ENDPOINT};
pub use tasks::BackgroundTasks;
