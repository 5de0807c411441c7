use serde::{Deserialize, Serialize};

pub const DEFAULT_EXTINCTION_SECS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// WCAG relative luminance
    pub fn relative_luminance(&self) -> f64 {
        let linear = |c: u8| {
            let v = c as f64 / 255.0;
            if v <= 0.03928 {
                v / 12.92
            } else {
                ((v + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }
}

/// Colours of a reception cell: green fading to black as the last message
/// ages, with a readable text colour on top
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liveness {
    pub background: Rgb,
    pub foreground: Rgb,
}

impl Liveness {
    pub fn from_age(age_secs: f64, extinction_secs: f64) -> Self {
        let fade = if extinction_secs > 0.0 {
            1.0 - age_secs / extinction_secs
        } else {
            0.0
        };
        let green = (255.0 * fade).clamp(0.0, 255.0) as u8;
        let background = Rgb::new(0, green, 0);

        // Contrast threshold, slightly above the WCAG midpoint
        let threshold = (1.05f64 * 0.05).sqrt() + 0.01;
        let foreground = if background.relative_luminance() > threshold {
            Rgb::BLACK
        } else {
            Rgb::WHITE
        };

        Self {
            background,
            foreground,
        }
    }
}

/// Reception column text: age and mean frequency
pub fn reception_text(age_secs: f64, frequency_hz: f64) -> String {
    format!(" {:.0}s ({:.1} Hz) ", age_secs, frequency_hz)
}

/// Sort key for the reception column: tenths of Hz, coarsened to hundreds
/// above 10 Hz so fast messages do not reshuffle on every refresh
pub fn frequency_sort_key(frequency_hz: f64) -> i64 {
    let tenths = (frequency_hz * 10.0) as i64;
    if tenths >= 100 {
        ((tenths as f64 / 100.0).round() as i64) * 100
    } else {
        tenths
    }
}
