//! WhatsApp channel: replies go out through the Twilio Messages API.

use crate::channels::messenger::{ChannelError, Messenger};
use crate::config::TwilioCredentials;
use async_trait::async_trait;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Address prefix Twilio uses for WhatsApp endpoints (`whatsapp:+15551234567`).
const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Bare sender number from a Twilio `From` address: everything after the last `whatsapp:`.
/// An address without the prefix is returned unchanged.
pub fn sender_from_address(address: &str) -> &str {
    address.rsplit(WHATSAPP_PREFIX).next().unwrap_or(address)
}

fn whatsapp_address(number: &str) -> String {
    if number.starts_with(WHATSAPP_PREFIX) {
        number.to_string()
    } else {
        format!("{}{}", WHATSAPP_PREFIX, number)
    }
}

/// WhatsApp sender backed by a Twilio account.
pub struct WhatsAppChannel {
    id: String,
    api_base: String,
    credentials: TwilioCredentials,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(credentials: TwilioCredentials, api_base: Option<String>) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| TWILIO_API_BASE.to_string());
        Self {
            id: "whatsapp".to_string(),
            api_base,
            credentials,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.credentials.account_sid
        )
    }

    /// Create a message via POST /2010-04-01/Accounts/{sid}/Messages.json.
    pub async fn send_message(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        let from = whatsapp_address(&self.credentials.whatsapp_number);
        let to = whatsapp_address(recipient);
        let res = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", text)])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("create message failed: {} {}", status, body)));
        }
        log::debug!("whatsapp: message delivered to {}", to);
        Ok(())
    }
}

#[async_trait]
impl Messenger for WhatsAppChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        WhatsAppChannel::send_message(self, recipient, text).await
    }
}
