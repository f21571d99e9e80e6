//! Core engine — change detection and the poll → detect → persist → notify loop.

pub mod detector;
pub mod coordinator;
pub mod scheduler;
