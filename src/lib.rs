//! subwatch - Subtitle Translation Watcher
//!
//! Watches directories for SRT and ASS subtitle files, translates their
//! dialogue through an external provider in one batch per file and writes a
//! structurally identical copy next to the original. A ledger keeps rescans
//! idempotent.

pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod subtitle;
pub mod translate;
pub mod workflow;
