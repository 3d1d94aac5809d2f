//! Interests migration: moves the "interests" attribute from a CSV export
//! onto existing contacts in the marketing contacts API.

pub mod config;
pub mod contacts;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod reader;
pub mod retry;
