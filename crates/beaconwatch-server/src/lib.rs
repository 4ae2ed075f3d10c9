//! # beaconwatch-server
//!
//! HTTP server library for the beaconwatch Eddystone presence tracker.
//!
//! This library provides the API handlers, page title resolution, and state
//! management for beaconwatch.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod pages;
pub mod state;
