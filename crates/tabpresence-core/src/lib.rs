//! Core library for tabpresence.
//!
//! Classifies browser windows by their titles, picks the most recently seen
//! browser, and publishes it as presence through a [`presence::PresencePublisher`].

pub mod browsers;
pub mod config;
pub mod detectors;
pub mod monitor;
pub mod presence;
pub mod system;
