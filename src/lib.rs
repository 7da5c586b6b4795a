//! Scoring for bouldering competitions.
//!
//! Each route in a room is worth a fixed budget L derived from the number of
//! normal-class competitors. Normal-class members who complete a route split
//! its L evenly; custom-class members earn the full L for every route they
//! complete. [`scoring::Scorer`] re-derives every score of a room after each
//! mutation, and [`competition::Competition`] wraps the mutations that
//! trigger it.

pub mod competition;
pub mod config;
pub mod model;
pub mod output;
pub mod scoring;
pub mod store;
