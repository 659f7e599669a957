//! Offline-first data access for the lineup client.
//!
//! The pieces compose as: UI code talks to a [`Coordinator`] per entity
//! collection; the coordinator consults the [`IdentityMemo`] when a
//! caller identity is needed, fetches through the
//! [`RemoteDataService`] boundary, writes through the
//! [`EnvelopeStore`](lineup_cache::EnvelopeStore) on success and falls
//! back to it on connectivity loss. Realtime snapshots arrive through a
//! [`Subscription`] and replace the in-memory view wholesale. The
//! [`SessionController`] clears memo and store on sign-out so a second
//! account on the same device never observes the first account's rows.
//!
//! The store and memo are process-wide service objects constructed once
//! and passed by reference; nothing here reaches into another
//! component's storage directly.

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod identity;
pub mod realtime;
pub mod remote;
pub mod rest;
pub mod session;

pub use auth::{reverify, AuthEvent, AuthProvider, Credentials};
pub use config::{CacheSection, ClientConfig, ConfigError, CredentialsConfig, ReconnectConfig};
pub use coordinator::{Coordinator, Fetched};
pub use error::ClientError;
pub use identity::{IdentityMemo, IdentityResolver, ProfileResolver};
pub use realtime::{RealtimeClient, Snapshot, Subscription};
pub use remote::RemoteDataService;
pub use rest::RestDataService;
pub use session::SessionController;
