use serde::Serialize;

/// Body of every successful response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage<T = ()> {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ApiMessage {
    pub fn message(message: &'static str) -> Self {
        Self {
            message,
            data: None,
        }
    }
}

impl<T> ApiMessage<T> {
    pub fn with_data(message: &'static str, data: Option<T>) -> Self {
        Self { message, data }
    }
}
