// src/dag/mod.rs

//! Dependency-ordered traversal of the declared process set.

pub mod walker;

pub use walker::with_processes;
