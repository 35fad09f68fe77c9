//! yougile-sync - mirror a YouGile workspace into a relational database
//!
//! This library pulls boards, users, columns, tasks and tag groups from the
//! YouGile REST API, flattens the tag taxonomy into per-task categorical
//! columns, and writes new records into Postgres (or SQLite) idempotently.
//!
//! # Modules
//!
//! The library is organized into several key modules:
//!
//! * [`backend`] - Remote collection interface and the YouGile HTTP client
//! * [`config`] - Application configuration management
//! * [`storage`] - Database connection and schema creation
//! * [`repositories`] - Existing-id loading and batched upserts
//! * [`sync`] - The synchronization pipeline and record mapping
//! * [`utils`] - Utility functions and helpers

/// Remote collection layer and YouGile API client
pub mod backend;

/// Configuration module for managing application settings
pub mod config;

/// Application constants and default values
pub mod constants;

/// SeaORM entity models for database tables
pub mod entities;

/// Logging setup
pub mod logger;

/// Repository layer for database operations
pub mod repositories;

/// Database connection and schema management
pub mod storage;

/// Synchronization engine
pub mod sync;

/// Utility functions for date handling
pub mod utils;

// Re-export entity models for convenient access
pub use entities::{board, task, user};
