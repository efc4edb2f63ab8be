//! SQLite-backed vector store

pub mod store;
