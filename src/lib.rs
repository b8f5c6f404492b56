//! # Targeting Finder
//!
//! Search Meta Ads targeting taxonomies (interests, behaviors, job titles,
//! employers, education, industries) through a proxy that keeps the Graph
//! API credential server-side, collect picks into a selection, and export
//! them as CSV or JSON.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ tfind shell  │──▶│ Taxonomy     │──▶│ Graph API    │
//! │ search/sugg. │   │ proxy (axum) │   │ /search      │
//! └──────────────┘   └──────┬───────┘   └──────────────┘
//!                           │ /consult
//!                           ▼
//!                    ┌──────────────┐
//!                    │ Lead webhook │
//!                    └──────────────┘
//! ```
//!
//! The UI state (controller, suggestion dropdown, selection, exports, lead
//! form) lives in the `targeting-finder-core` crate and has no I/O. This
//! crate adds the network, the server, and the terminal front end.
//!
//! ## Quick Start
//!
//! ```bash
//! export META_ACCESS_TOKEN=…
//! tfind serve                                  # run the proxy
//! tfind search interests "coffee" --country US
//! tfind shell --server http://127.0.0.1:3000
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`graph`] | Graph API search client |
//! | [`proxy`] | Taxonomy request validation and reshaping |
//! | [`lead`] | Lead webhook forwarder and `consult` command |
//! | [`server`] | HTTP proxy server |
//! | [`client`] | HTTP and in-process fetchers |
//! | [`search`] | One-shot `search` and `suggest` commands |
//! | [`session`] | Interactive event loop |
//! | [`shell`] | Shell command parsing and rendering |
//! | [`export`] | File export and clipboard sinks |

pub mod client;
pub mod config;
pub mod export;
pub mod graph;
pub mod lead;
pub mod proxy;
pub mod search;
pub mod server;
pub mod session;
pub mod shell;
