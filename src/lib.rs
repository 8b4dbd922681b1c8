//! # Realm Auth
//!
//! Client-side SRP6 authentication for legacy realm servers: the
//! logon-challenge / logon-proof handshake followed by a realm-list
//! request, over a single TCP connection.
//!
//! ## Layers
//!
//! - [`protocol`] — wire messages, framing codec, the SRP6 key exchange,
//!   and the session state machine.
//! - [`transport`] — the socket transport: one receive and at most one
//!   send in flight, with a FIFO outbound queue.
//! - [`service`] — the [`AuthClient`] facade tying both together.
//! - [`config`] — TOML- and environment-backed configuration.
//!
//! ## Example
//!
//! ```no_run
//! use realm_auth::config::ClientConfig;
//! use realm_auth::service::AuthClient;
//!
//! # async fn run() -> realm_auth::error::Result<()> {
//! let mut config = ClientConfig::default();
//! config.account.name = "TEST".into();
//! config.account.password = "TEST".into();
//!
//! let client = AuthClient::new(config)?;
//! for realm in client.authenticate().await? {
//!     println!("{realm}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use config::ClientConfig;
pub use error::{AuthError, Result, SafeguardViolation};
pub use protocol::message::{AuthResult, Realm, RealmFlags};
pub use protocol::session::{AuthSession, SessionOutcome};
pub use protocol::srp6::Srp6Verifier;
pub use service::AuthClient;
pub use transport::{Connection, PacketHandler, PacketSink, Transport};
