//! paramtree: named parameter trees with randomized root-to-leaf selection.
//!
//! Layers, inner to outer:
//! - [`domain`]: entities, batch validation, walks and enumeration (no I/O)
//! - [`application`]: services composing the domain with storage and cache
//! - [`infrastructure`]: store backends, result cache, DI container
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
