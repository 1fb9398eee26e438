//! Shared test infrastructure for vinyl-player integration tests
//!
//! - `fakes`: recording backends and a ready-made coordinator rig
//! - `test_server`: router, sequencer and shared state over a temp data folder

#![allow(dead_code)]

pub mod fakes;
pub mod test_server;
