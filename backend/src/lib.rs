//! MinerIA backend: copper-vein detection over uploaded rock-surface photos.
//!
//! Exposes registration/login, an authenticated analysis pipeline (upload,
//! classify, persist, PDF report) and read endpoints over the stored results.

pub mod analysis;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ml;
pub mod report;
pub mod routes;
pub mod storage;
