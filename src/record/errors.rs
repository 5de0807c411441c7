use thiserror::Error;

use crate::core::SenderId;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("cannot record unknown sender: {sender_id}; known senders are: {known:?}")]
    UnknownSender {
        sender_id: SenderId,
        known: Vec<SenderId>,
    },
    #[error("no messages in this log")]
    NoMessage,
    #[error("message {message} has no field named {field}")]
    FieldNotFound { message: String, field: String },
    #[error("recorder is stopped")]
    Stopped,
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
