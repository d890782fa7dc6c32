// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the WhatsApp Cloud API webhook payload.
//!
//! Only the fields Fixline consumes are modeled; everything else in the
//! payload is ignored during deserialization. Status-change events arrive on
//! the same endpoint with an empty `messages` array.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub value: ChangeValue,
}

#[derive(Debug, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    /// Sender phone number in international format, without a plus sign.
    pub from: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<TextContent>,
    pub image: Option<MediaContent>,
    pub location: Option<LocationContent>,
}

impl InboundMessage {
    /// Normalizes the message into the single text line the conversation
    /// engine consumes. Images become their media id (the id-photo step
    /// stores it as a reference); locations become "lat, lon".
    pub fn as_text(&self) -> Option<String> {
        match self.kind.as_str() {
            "text" => self.text.as_ref().map(|t| t.body.clone()),
            "image" => self.image.as_ref().map(|i| i.id.clone()),
            "location" => self
                .location
                .as_ref()
                .map(|l| format!("{}, {}", l.latitude, l.longitude)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaContent {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationContent {
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_text_message_payload() {
        let raw = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {"phone_number_id": "999"},
                        "messages": [{
                            "from": "263771234567",
                            "id": "wamid.1",
                            "timestamp": "1767200000",
                            "type": "text",
                            "text": {"body": "I need my laundry done"}
                        }]
                    }
                }]
            }]
        });
        let payload: WebhookPayload = serde_json::from_value(raw).unwrap();
        let message = &payload.entry[0].changes[0].value.messages[0];
        assert_eq!(message.from, "263771234567");
        assert_eq!(message.as_text().as_deref(), Some("I need my laundry done"));
    }

    #[test]
    fn status_events_have_no_messages() {
        let raw = serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {"statuses": [{"status": "delivered"}]}
                }]
            }]
        });
        let payload: WebhookPayload = serde_json::from_value(raw).unwrap();
        assert!(payload.entry[0].changes[0].value.messages.is_empty());
    }

    #[test]
    fn image_and_location_messages_normalize_to_text() {
        let image: InboundMessage = serde_json::from_value(serde_json::json!({
            "from": "1", "type": "image", "image": {"id": "media-123"}
        }))
        .unwrap();
        assert_eq!(image.as_text().as_deref(), Some("media-123"));

        let location: InboundMessage = serde_json::from_value(serde_json::json!({
            "from": "1", "type": "location",
            "location": {"latitude": -17.83, "longitude": 31.05}
        }))
        .unwrap();
        assert_eq!(location.as_text().as_deref(), Some("-17.83, 31.05"));

        let sticker: InboundMessage = serde_json::from_value(serde_json::json!({
            "from": "1", "type": "sticker"
        }))
        .unwrap();
        assert!(sticker.as_text().is_none());
    }
}
