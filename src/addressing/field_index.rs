use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::SenderId;

/// Address of one plottable value: a field of a message from a given
/// sender, optionally one element of an array field
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldIndex {
    pub sender_id: SenderId,
    pub class_name: String,
    pub message_name: String,
    pub field: String,
    pub array_index: Option<usize>,
}

impl FieldIndex {
    pub fn new(
        sender_id: SenderId,
        class_name: impl Into<String>,
        message_name: impl Into<String>,
        field: impl Into<String>,
        array_index: Option<usize>,
    ) -> Self {
        Self {
            sender_id,
            class_name: class_name.into(),
            message_name: message_name.into(),
            field: field.into(),
            array_index,
        }
    }

    /// Field name with its element suffix, e.g. `values[2]`
    pub fn display_field(&self) -> String {
        match self.array_index {
            Some(i) => format!("{}[{}]", self.field, i),
            None => self.field.clone(),
        }
    }
}

impl std::fmt::Display for FieldIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.sender_id,
            self.class_name,
            self.message_name,
            self.display_field()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AddressError {
    #[error("unexpected segment count {segments} (instead of at least 4) in field reference {text:?}")]
    TooFewSegments { text: String, segments: usize },
    #[error("invalid sender id {value:?} in field reference {text:?}")]
    InvalidSender { text: String, value: String },
    #[error("invalid array index {value:?} in field reference {text:?}")]
    InvalidIndex { text: String, value: String },
    #[error("empty array range {lo}-{hi} in field reference {text:?}")]
    EmptyRange { text: String, lo: usize, hi: usize },
}

/// Decoded field reference: the concrete indices and the advisory scale
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReference {
    pub indices: Vec<FieldIndex>,
    pub scale: f64,
}

fn format_scale(scale: f64) -> String {
    // Debug keeps a decimal point on whole numbers ("1.0")
    format!("{:?}", scale)
}

/// Encode one concrete field index: `sender:class:message:field[i]:scale`
pub fn encode(index: &FieldIndex, scale: f64) -> String {
    format!("{}:{}", index, format_scale(scale))
}

/// Encode a contiguous selection of array elements as one reference
/// (`field[lo-hi]`, both ends inclusive)
pub fn encode_range(index: &FieldIndex, lo: usize, hi: usize, scale: f64) -> String {
    let range = if lo == hi {
        lo.to_string()
    } else {
        format!("{}-{}", lo, hi)
    };
    format!(
        "{}:{}:{}:{}[{}]:{}",
        index.sender_id,
        index.class_name,
        index.message_name,
        index.field,
        range,
        format_scale(scale)
    )
}

/// Decode a field reference into one `FieldIndex` per concrete array element
pub fn decode(text: &str) -> Result<Vec<FieldIndex>, AddressError> {
    decode_reference(text).map(|r| r.indices)
}

pub fn decode_reference(text: &str) -> Result<FieldReference, AddressError> {
    let split: Vec<&str> = text.split(':').collect();
    if split.len() < 4 {
        return Err(AddressError::TooFewSegments {
            text: text.to_string(),
            segments: split.len(),
        });
    }

    let sender_id: SenderId = split[0].trim().parse().map_err(|_| AddressError::InvalidSender {
        text: text.to_string(),
        value: split[0].to_string(),
    })?;
    let class_name = split[1];
    let message_name = split[2];
    let field_info = split[3];

    let scale = split
        .get(4)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(1.0);

    let (field_name, elements) = match field_info.split_once('[') {
        Some((name, rest)) => {
            let range_txt = rest.strip_suffix(']').unwrap_or(rest);
            (name, parse_range(text, range_txt)?)
        }
        None => (field_info, vec![None]),
    };

    let indices = elements
        .into_iter()
        .map(|e| FieldIndex::new(sender_id, class_name, message_name, field_name, e))
        .collect();

    Ok(FieldReference { indices, scale })
}

fn parse_range(text: &str, range_txt: &str) -> Result<Vec<Option<usize>>, AddressError> {
    let parse = |value: &str| {
        value.trim().parse::<usize>().map_err(|_| AddressError::InvalidIndex {
            text: text.to_string(),
            value: value.to_string(),
        })
    };

    match range_txt.split_once('-') {
        Some((lo, hi)) => {
            let (lo, hi) = (parse(lo)?, parse(hi)?);
            if lo > hi {
                return Err(AddressError::EmptyRange {
                    text: text.to_string(),
                    lo,
                    hi,
                });
            }
            Ok((lo..=hi).map(Some).collect())
        }
        None => Ok(vec![Some(parse(range_txt)?)]),
    }
}
