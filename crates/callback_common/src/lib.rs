// --- File: crates/callback_common/src/lib.rs ---
pub mod logging;
pub mod services;
