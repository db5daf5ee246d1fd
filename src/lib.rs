//! Web form backend for primer design and primer specificity checking.
//!
//! The heavy lifting (Primer3, FASTA indexing, specificity scoring) is done by
//! external tools. This crate validates what the form submits, lays out a
//! per-job workspace, runs the tools in order, and hands back their HTML.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod render;
