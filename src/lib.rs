//! Tsuga Provider
//!
//! A plugin for declarative infrastructure tools that manages Tsuga teams,
//! dashboards, monitors, log routes, notification rules and silences,
//! retention and tag policies, and ingestion API keys through the Tsuga REST
//! API. Teams and users can also be looked up read-only as data sources.
//!
//! # Overview
//!
//! The crate has two layers:
//!
//! - **Protocol**: the gRPC provider protocol ([`ProviderService`], [`serve`]),
//!   schema types, local planning and validation.
//! - **Tsuga**: [`TsugaProvider`], the API client and one internal module per
//!   resource. Each resource converts between its configuration model and the
//!   API's JSON body in both directions (`expand`/`flatten`).
//!
//! Log routes are the interesting case: `split` processors nest processor
//! lists inside themselves, and the schema unrolls that tree to a fixed
//! depth of [`MAX_PROCESSOR_DEPTH`] levels.
//!
//! # Running
//!
//! ```no_run
//! use tsuga_provider::{serve, TsugaProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     tsuga_provider::init_logging();
//!     serve(TsugaProvider::new()).await
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it prints a handshake line to
//! stdout:
//!
//! ```text
//! TSUGA_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `TSUGA_PROVIDER|<protocol_version>|<address>`. The host spawns the
//! provider as a subprocess, reads this line and connects over gRPC. Logs go
//! to stderr.
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: resource and data source type names
//! - **GetSchema**: provider, resource and data source schemas
//! - **ValidateProviderConfig** / **Configure**: `base_url` and `token`, with
//!   `TSUGA_BASE_URL` / `TSUGA_TOKEN` fallbacks
//! - **Stop**: graceful shutdown
//! - **ValidateResourceConfig**: schema checks plus enum, range and oneof rules
//! - **UpgradeResourceState**: identity, every schema is at version 0
//! - **Plan**: local diff against prior state
//! - **Create/Read/Update/Delete**: one API call each
//! - **ImportResourceState**: import by id
//! - **ValidateDataSourceConfig** / **ReadDataSource**: `tsuga_team` by id or
//!   unique name, `tsuga_user` by id

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

mod data_sources;
mod resources;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use client::TsugaClient;
pub use config::{ProviderConfig, ResolvedConfig};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::TsugaProvider;
pub use resources::processor::MAX_PROCESSOR_DEPTH;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ReadResult,
    ServerCapabilities, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};
