//! Sous core library — configuration, completion client, WhatsApp messenger,
//! conversation store, and the webhook gateway used by the CLI.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod init;
pub mod llm;
pub mod prompt;
pub mod store;
