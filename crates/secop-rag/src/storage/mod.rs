//! Storage module for persistent data storage
//!
//! Provides the SQLite-backed vector store for entries and passages.

pub mod codec;
mod database;

pub use database::VectorStore;
