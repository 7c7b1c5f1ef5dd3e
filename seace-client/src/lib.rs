//! SEACE Client - Cached Backend Access
//!
//! Talks to the Apps Script backend over HTTP, normalizes every response
//! into the canonical types of `seace-core` and routes reads through the
//! response cache. Writes to tracked tenders invalidate the reads they make
//! stale.

pub mod actions;
pub mod adapter;
pub mod client;
pub mod error;
pub mod invalidation;
pub mod keys;
pub mod rest;

pub use actions::Action;
pub use adapter::TenderPage;
pub use client::{cache_from_settings, SeaceClient, TrackingUpdate};
pub use error::FetchError;
pub use invalidation::Invalidator;
pub use keys::TenderFilters;
pub use rest::{check_backend_error, encode_payload, Backend, Params, RestClient};
