//! Types shared between the certkeeper service and its clients.
//!
//! [`params`] holds request inputs, [`views`] holds everything the API hands back.

pub mod params;
pub mod views;
