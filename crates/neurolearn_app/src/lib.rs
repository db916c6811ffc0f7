//! NeuroLearn terminal front end: CLI, configuration, and the loop that drives
//! the core state machine against the engine.
pub mod platform;
