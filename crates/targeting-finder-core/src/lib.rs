//! # Targeting Finder Core
//!
//! Pure logic for Targeting Finder: taxonomy data models, the selection
//! set and its exports, the category → proxy request mapping, the
//! suggestion dropdown state machine, the search controller, and the lead
//! form model.
//!
//! This crate contains no tokio, sockets, or filesystem I/O. Network
//! access is abstracted behind [`controller::TaxonomyFetcher`] and
//! clipboard access behind [`export::ClipboardSink`]; the `targeting-finder`
//! app crate supplies the concrete implementations.

pub mod controller;
pub mod export;
pub mod lead;
pub mod models;
pub mod request;
pub mod selection;
pub mod suggest;
