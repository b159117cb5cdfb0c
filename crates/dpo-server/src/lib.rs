//! Shared library surface for the planning server and its tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod planning;
pub mod state;
