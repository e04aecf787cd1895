//! Gateway: HTTP server for the health probe and the Twilio WhatsApp webhook.
//!
//! Each request runs on its own task; the only shared state is the injected collaborators
//! in [`GatewayState`].

mod server;
mod webhook;

pub use server::{router, run_gateway, GatewayState};
pub use webhook::{InboundForm, WebhookError};
