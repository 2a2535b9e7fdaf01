//! Panel Sync
//!
//! Keeps a small set of panel controls (three buttons, a speed slider and ten
//! secondary buttons) consistent across a serial touchscreen, a single
//! wireless peer, an operator console and durable storage.

pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod gpio;
pub mod paths;
pub mod peer;
pub mod state;
pub mod surface;
pub mod touchscreen;
