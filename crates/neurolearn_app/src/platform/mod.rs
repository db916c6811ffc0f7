pub mod app;
pub mod cli;
pub mod config;
pub mod effects;
pub mod input;
pub mod logging;
pub mod render;

pub use app::run;
