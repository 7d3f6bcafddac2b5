//! Core types and trait definitions for the Royale warehouse sync.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the record types, the season calendar, delta resolution, and the
//! quarantine tracker, plus the traits the outer crates implement.

// Native `async fn` / RPITIT in traits; the returned futures are bounded by
// `Send` explicitly where it matters.
#![allow(async_fn_in_trait)]

pub mod battle;
pub mod delta;
pub mod error;
pub mod quarantine;
pub mod record;
pub mod season;
pub mod source;
pub mod store;

pub use error::{Error, Result};
