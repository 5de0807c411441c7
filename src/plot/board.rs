use serde::Serialize;

use crate::addressing::{decode_reference, encode, AddressError, FieldIndex};
use crate::record::{IdentityIndex, Recorder};
use crate::view::Rgb;

/// Line colours, assigned in order and cycled
pub const PALETTE: [Rgb; 7] = [
    Rgb::new(239, 230, 69),
    Rgb::new(233, 53, 161),
    Rgb::new(0, 227, 255),
    Rgb::new(225, 86, 44),
    Rgb::new(83, 126, 255),
    Rgb::new(0, 203, 133),
    Rgb::new(238, 238, 238),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    pub index: FieldIndex,
    pub scale: f64,
    pub colour: Rgb,
}

impl PlotSeries {
    /// Reference text of this single line, for dragging it elsewhere
    pub fn reference_text(&self) -> String {
        encode(&self.index, self.scale)
    }
}

/// Sampled points of one series. Times are seconds relative to the
/// sampling instant (never positive), oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesData {
    pub index: FieldIndex,
    pub colour: Rgb,
    pub times_s: Vec<f64>,
    pub values: Vec<f64>,
}

/// Set of plotted field values, fed by dropped field references
#[derive(Debug, Clone, Default)]
pub struct PlotBoard {
    series: Vec<PlotSeries>,
    line_counter: usize,
}

impl PlotBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the values named by a field reference. Already plotted indices
    /// are skipped. Returns how many series were added.
    pub fn drop_text(&mut self, text: &str) -> Result<usize, AddressError> {
        let reference = decode_reference(text)?;
        let mut added = 0;

        for index in reference.indices {
            if self.contains(&index) {
                log::debug!("{} is already plotted", index);
                continue;
            }
            let colour = PALETTE[self.line_counter % PALETTE.len()];
            self.line_counter += 1;
            self.series.push(PlotSeries {
                index,
                scale: reference.scale,
                colour,
            });
            added += 1;
        }
        Ok(added)
    }

    pub fn contains(&self, index: &FieldIndex) -> bool {
        self.series.iter().any(|s| &s.index == index)
    }

    pub fn remove(&mut self, index: &FieldIndex) -> bool {
        let before = self.series.len();
        self.series.retain(|s| &s.index != index);
        self.series.len() != before
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    pub fn series(&self) -> &[PlotSeries] {
        &self.series
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn sample(&self, recorder: &Recorder, now: u64) -> Vec<SeriesData> {
        self.sample_index(recorder.index(), now)
    }

    /// Sample every series from the recorded histories. Series whose
    /// message is not recorded yet are left out; snapshots lacking the
    /// field or a numeric value are skipped.
    pub fn sample_index(&self, index: &IdentityIndex, now: u64) -> Vec<SeriesData> {
        self.series
            .iter()
            .filter_map(|series| {
                let key = &series.index;
                let identity = index.resolve(key.sender_id, &key.class_name, &key.message_name)?;
                let history = index.get(identity)?;

                let mut times_s = Vec::with_capacity(history.sample_count());
                let mut values = Vec::with_capacity(history.sample_count());
                for snapshot in history.iter().rev() {
                    let Some(value) = snapshot
                        .field(&key.field)
                        .and_then(|f| f.value.element(key.array_index))
                        .and_then(|v| v.as_f64())
                    else {
                        continue;
                    };
                    times_s.push(-(now.saturating_sub(snapshot.timestamp()) as f64) / 1e9);
                    values.push(value * series.scale);
                }

                Some(SeriesData {
                    index: key.clone(),
                    colour: series.colour,
                    times_s,
                    values,
                })
            })
            .collect()
    }
}
