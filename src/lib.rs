//! tabpresence publishes the browser tab you are looking at as a presence
//! status. The detection and monitoring machinery lives in
//! `tabpresence-core`; this crate adds the command line front end.

pub mod app;

pub use tabpresence_core::{browsers, config, detectors, monitor, presence, system};
