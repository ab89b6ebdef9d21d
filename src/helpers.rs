//! Client-side framing helpers for test harnesses and scripted clients.

use thiserror::Error;
use wordchain_protocol::{Ack, ClientRequest, Intent, ServerEvent, ServerMessage};

#[derive(Error, Debug)]
pub enum HelperError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected an ack, got event {0}")]
    UnexpectedEvent(&'static str),
    #[error("expected an event, got an ack")]
    UnexpectedAck,
}

pub fn encode_request(id: u64, intent: Intent) -> Result<String, HelperError> {
    let request = ClientRequest {
        id: Some(id),
        intent,
    };
    Ok(serde_json::to_string(&request)?)
}

pub fn decode_server_message(text: &str) -> Result<ServerMessage, HelperError> {
    Ok(serde_json::from_str(text)?)
}

pub fn decode_ack(text: &str) -> Result<Ack, HelperError> {
    match decode_server_message(text)? {
        ServerMessage::Ack(ack) => Ok(ack),
        ServerMessage::Event(event) => Err(HelperError::UnexpectedEvent(event.name())),
    }
}

pub fn decode_event(text: &str) -> Result<ServerEvent, HelperError> {
    match decode_server_message(text)? {
        ServerMessage::Event(event) => Ok(event),
        ServerMessage::Ack(_) => Err(HelperError::UnexpectedAck),
    }
}
