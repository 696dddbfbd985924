//! EntityGraph - relational graph materialization
//!
//! This crate loads object graphs out of relational tables through:
//! - Join trees describing which tables to join and how rows become beans
//! - Flat aliased SQL select generation for a whole tree
//! - Row hydration with per-load identity deduplication
//! - A loader running the select through a pluggable executor

pub mod config;
pub mod hydrator;
pub mod join_tree;
pub mod loader;
pub mod mapping;
pub mod query_builder;
