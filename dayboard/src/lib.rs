//! Dayboard library
//!
//! Optimistic staging, debounced commit and backend sync for the todo and
//! idea lists of a personal productivity dashboard.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod remote;
pub mod services;
pub mod staging;
pub mod storage;
