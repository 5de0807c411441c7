pub mod board;

pub use board::{PlotBoard, PlotSeries, SeriesData, PALETTE};
