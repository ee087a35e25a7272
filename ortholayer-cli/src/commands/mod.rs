//! CLI command implementations.
//!
//! - [`mount`] - Serve a backing directory with generated textures
//! - [`init`] - Write a default config file
//! - [`check`] - Show how a path is classified

pub mod check;
pub mod init;
pub mod mount;
