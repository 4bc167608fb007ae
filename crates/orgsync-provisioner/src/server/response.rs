use std::fmt::Display;

use axum::Json;
use serde::Serialize;

#[derive(Serialize, Debug)]
pub(crate) struct MessagePayload<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    err: Option<String>,
}

pub fn message_payload(message: &str) -> Json<MessagePayload<'_>> {
    Json(MessagePayload { message, err: None })
}

pub fn message_payload_with_error(message: &str, err: impl Display) -> Json<MessagePayload<'_>> {
    Json(MessagePayload { message, err: Some(err.to_string()) })
}
