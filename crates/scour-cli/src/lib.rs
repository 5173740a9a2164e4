//! Command-line front end for `scour-query`.
//!
//! Compiles HTTP search query strings into search engine query documents
//! offline, for inspecting what a request turns into.

pub mod cli;
pub mod commands;
pub mod config;
