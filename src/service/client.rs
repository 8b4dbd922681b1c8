//! High-level authentication client.
//!
//! Wraps connecting, the handshake session, and the realm-list request
//! behind one call. One client performs one authentication attempt per
//! [`AuthClient::authenticate`] call; the connection is closed when the
//! session reaches a terminal state.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::error::{AuthError, Result};
use crate::protocol::message::Realm;
use crate::protocol::session::{AuthSession, SessionOutcome};
use crate::transport::Transport;

/// Authentication client for one realm server.
pub struct AuthClient {
    config: ClientConfig,
    token: Option<String>,
}

impl AuthClient {
    /// Create a client from a validated configuration.
    ///
    /// # Errors
    /// Returns [`AuthError::ConfigError`] when the configuration fails
    /// strict validation.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate_strict()?;
        Ok(Self {
            config,
            token: None,
        })
    }

    /// Attach an extra-authentication token to send with the logon proof.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Connect, authenticate, and fetch the realm list.
    ///
    /// An empty list means authentication succeeded but the server has no
    /// realms to offer.
    ///
    /// # Errors
    /// [`AuthError::Timeout`] if the connection attempt exceeds the
    /// configured timeout, [`AuthError::ServerRejected`] or
    /// [`AuthError::ServerProofInvalid`] for handshake failures, and
    /// [`AuthError::MalformedPacket`] for undecodable server data.
    #[instrument(skip(self), fields(server = %self.config.connection.address))]
    pub async fn authenticate(&self) -> Result<Vec<Realm>> {
        let address = &self.config.connection.address;
        debug!("connecting");
        let stream = timeout(
            self.config.connection.connect_timeout,
            TcpStream::connect(address),
        )
        .await
        .map_err(|_| AuthError::Timeout)??;
        info!("connected");

        let (connection, transport) = Transport::pair(stream);
        // StdRng rather than the thread-local handle: the session holds the
        // RNG across awaits, and ThreadRng is not Send.
        let mut session = AuthSession::new(
            self.config.account.clone(),
            self.config.client_info.clone(),
            transport,
            StdRng::from_rng(&mut rand::rng()),
        );
        if let Some(token) = &self.token {
            session = session.with_token(token.clone());
        }

        session.start()?;
        connection.run(&mut session).await?;

        match session.into_outcome() {
            Some(SessionOutcome::Realms(realms)) => Ok(realms),
            Some(SessionOutcome::NoRealms) => Ok(Vec::new()),
            Some(SessionOutcome::Failed(error)) => Err(error),
            None => Err(AuthError::ConnectionClosed),
        }
    }
}
