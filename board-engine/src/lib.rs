//! Departure board engine.
//!
//! Turns a static transit snapshot plus live schedules, predictions,
//! vehicles and alerts into route cards: what leaves from each nearby stop,
//! grouped by line or route and direction, with the alerts that matter to
//! riders standing there.

pub mod alerts;
pub mod cards;
pub mod config;
pub mod display;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod global;
pub mod realtime;
pub mod sorting;
pub mod terminal;
pub mod web;
