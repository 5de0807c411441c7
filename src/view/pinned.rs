use serde::Serialize;

use crate::addressing::{encode, encode_range, FieldIndex};
use crate::core::SenderId;
use crate::record::IdentityIndex;

use super::format::value_text;
use super::liveness::Liveness;
use super::pins::PinSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinnedRow {
    pub sender_id: SenderId,
    pub class_name: String,
    pub message_name: String,
    pub field: String,
    pub value_text: String,
    pub age_secs: f64,
    pub liveness: Liveness,
    /// Field reference text, for dragging the row into a plot
    pub reference: String,
}

/// Flat view of the pinned fields, rebuilt from the index on each refresh
#[derive(Debug, Clone, Default)]
pub struct PinnedRows {
    rows: Vec<PinnedRow>,
}

impl PinnedRows {
    /// Pins whose message or field is not recorded (yet) are skipped
    pub fn collect(pins: &PinSet, index: &IdentityIndex, now: u64, extinction_secs: f64) -> Self {
        let mut rows = Vec::with_capacity(pins.len());

        for key in pins.iter() {
            let Some(newest) = index.get(key.identity).and_then(|h| h.newest().ok()) else {
                continue;
            };
            let Some(field) = newest.field(&key.field) else {
                continue;
            };

            let address = FieldIndex::new(
                key.identity.sender_id,
                newest.class_name(),
                newest.name(),
                key.field.as_str(),
                None,
            );
            let reference = match field.value.len() {
                0 if field.is_array() => continue,
                len if field.is_array() => encode_range(&address, 0, len - 1, field.scale()),
                _ => encode(&address, field.scale()),
            };

            let age_secs = now.saturating_sub(newest.timestamp()) as f64 / 1e9;
            rows.push(PinnedRow {
                sender_id: key.identity.sender_id,
                class_name: newest.class_name().to_string(),
                message_name: newest.name().to_string(),
                field: key.field.clone(),
                value_text: value_text(field),
                age_secs,
                liveness: Liveness::from_age(age_secs, extinction_secs),
                reference,
            });
        }

        Self { rows }
    }

    pub fn rows(&self) -> &[PinnedRow] {
        &self.rows
    }

    pub fn for_sender(&self, sender_id: SenderId) -> impl Iterator<Item = &PinnedRow> {
        self.rows.iter().filter(move |r| r.sender_id == sender_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
