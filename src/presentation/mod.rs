//! Askama view contexts and render helpers.

pub mod views;
