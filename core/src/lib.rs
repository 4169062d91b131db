//! Stateless request builder and response normalizer for the Pokedex proxy.
//!
//! # Overview
//! Translates pagination, search and sort parameters into a PokeAPI GraphQL
//! query, and reshapes the upstream's list and detail payloads into the
//! stable shape the browser client consumes. Builds `HttpRequest` values and
//! parses `HttpResponse` values without touching the network (host-does-IO
//! pattern); the caller executes the actual HTTP round-trip.
//!
//! # Design
//! - `CatalogClient` holds only an `UpstreamConfig` and no mutable state.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - Every `parse_*` returns an `Outcome`; failures never panic and never
//!   carry partial results.
//! - Upstream wire types are private to `client`; only the normalized
//!   client-facing types are exported.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod types;

pub use client::CatalogClient;
pub use config::{ImagePolicy, UpstreamConfig};
pub use error::{ApiError, Outcome};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{
    Ability, CatalogEntryDetail, CatalogEntrySummary, Cursor, Form, ListQuery, Move, PagedResult,
    SortKey, Stat, VersionGroupDetail,
};
