//! Communication channels (WhatsApp via Twilio).
//!
//! The gateway talks to a channel only through [`Messenger`], so the webhook can be served
//! with any delivery backend.

mod messenger;
mod whatsapp;

pub use messenger::{ChannelError, Messenger};
pub use whatsapp::{sender_from_address, WhatsAppChannel};
