pub mod addressing;
pub mod config;
pub mod core;
pub mod engine;
pub mod observability;
pub mod plot;
pub mod record;
pub mod transport;
pub mod view;
