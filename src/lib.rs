//! # yamarec
//!
//! Fetch, cache, and filter hiking-activity records from Yamareco and YAMAP.
//!
//! yamarec dispatches a record URL to the adapter owning that site's markup,
//! extracts a normalized [`models::ActivityRecord`] tolerating whatever
//! fields the page fails to carry, and memoizes the result in a JSON file
//! cache. When static extraction comes back invalid, an authenticated
//! headless-browser fetch re-renders the page before giving up.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────┐   ┌──────────────┐
//! │ Adapters     │──▶│ RecordRetriever   │──▶│  JsonCache   │
//! │ Yamareco/    │   │ cache → static →  │   │ records/     │
//! │ YAMAP        │   │ dynamic fallback  │   │ listing/     │
//! └──────────────┘   └─────────┬─────────┘   └──────────────┘
//!                              ▼
//!                        ┌──────────┐
//!                        │   CLI    │
//!                        │ (yamarec)│
//!                        └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Record and listing types |
//! | [`adapter`] | Site-adapter trait and dispatch registry |
//! | [`sites`] | Yamareco and YAMAP adapters |
//! | [`retriever`] | Multi-tier record retrieval |
//! | [`cache`] | URL-keyed JSON file cache |
//! | [`fetch`] | Blocking HTTP transport |
//! | [`browser`] | Headless session for the dynamic fallback |
//! | [`directory`] | Mountain-name dictionary lookup |
//! | [`filter`] | Listing filters and name lists |
//! | [`units`] | Numeric and duration normalizers |

pub mod adapter;
pub mod browser;
pub mod cache;
pub mod config;
pub mod directory;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod retriever;
pub mod sites;
pub mod units;
