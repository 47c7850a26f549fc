//! Test fixtures describing the deployed blueprint.

pub mod blueprint;

pub use blueprint::ThreeTierApp;
