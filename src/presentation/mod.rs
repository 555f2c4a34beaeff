//! Terminal rendering of loader frames.

pub mod views;
