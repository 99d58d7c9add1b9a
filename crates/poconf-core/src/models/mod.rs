//! Data models shared by the extraction pipeline.

pub mod config;
pub mod confirmation;
pub mod field;
pub mod input;
