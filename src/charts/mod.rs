//! Charts module - Static chart rendering

mod renderer;

pub use renderer::{hex_color, timeline_bounds, StaticChartRenderer, PALETTE};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("No data to chart")]
    NoData,
    #[error("Chart rendering failed: {0}")]
    Render(String),
}
