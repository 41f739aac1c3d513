//! Stat handlers: Pro-Football-Reference page parsing, game weather and the stat registry.

mod handler;
pub mod pfr;
mod registry;
pub mod specs;
pub mod weather;
mod weekly;

pub use handler::{
    Conv, FieldSpec, ScrapeContext, StatHandler, TableHandler, TableSpec, DEFAULT_BASE_URL,
};
pub use registry::StatRegistry;
pub use weather::{WeatherFeed, WeatherHandler};
pub use weekly::{week_from_url, WeeklyTableHandler, REGULAR_SEASON_WEEKS};

pub const CRATE_NAME: &str = "gridiron-adapters";
