//! HTTP implementation of [`royale_core::source::GameSource`] for the public
//! Clash Royale API.

mod client;
mod models;

pub use client::{ClientConfig, RoyaleClient};
pub use royale_core::source::FetchError;
