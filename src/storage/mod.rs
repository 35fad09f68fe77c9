//! Relational store for synchronized data
//!
//! This module owns the database connection used by one sync run and the
//! schema for the three persisted tables:
//! - Boards
//! - Users
//! - Tasks

pub mod db;

pub use db::Store;
