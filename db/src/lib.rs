//! Persistence for certkeeper.
//!
//! [`models`] defines the documents as they are stored, [`storage`] the traits
//! the rest of the system talks to and their MongoDB and in-process
//! implementations.

pub mod models;
pub mod storage;
