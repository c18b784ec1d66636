// --- File: crates/callback_gcal/src/lib.rs ---
// Declare modules within this crate
pub mod auth;
pub mod service;
