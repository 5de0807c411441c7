use thiserror::Error;

use crate::core::{ClassId, SenderId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    /// A class row was about to be created twice; the tree no longer matches
    /// the index
    #[error(
        "tried to re-create an existing class with id {class_id} for sender {sender_id} \
         (new name '{new_name}' vs existing '{existing_name}')"
    )]
    ClassAlreadyExists {
        sender_id: SenderId,
        class_id: ClassId,
        new_name: String,
        existing_name: String,
    },
    #[error("invalid filter pattern: {0}")]
    InvalidPattern(String),
}
