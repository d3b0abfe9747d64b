//! Exclusive owner of a backend's connection handle.
//!
//! # Design
//! - The handle lives in a `Mutex<Option<_>>`; every access, including establishment,
//!   happens with the lock held for the whole blocking call.
//! - Establishment is check-and-connect under that lock, so concurrent callers never
//!   build two handles; whoever waits behind the first caller reuses its handle.
//! - Retries are bounded by a deadline, never by a count. No attempt starts after the
//!   deadline: the loop gives up when the next backoff would end past it.
//! - Guard methods block and must only run on worker threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use seedkeeper_torrent_core::{
    BackendEndpoint, BridgeError, BridgeResult, ClientResult, Connector, Deadline, TorrentId,
};
use tracing::{debug, info, warn};

use crate::config::ReconnectPolicy;

/// Lazily-established, mutually-exclusive connection to one backend.
pub struct ConnectionGuard<C: Connector> {
    endpoint: BackendEndpoint,
    connector: C,
    backoff: Duration,
    reconnect: ReconnectPolicy,
    client: Mutex<Option<C::Client>>,
    connected: AtomicBool,
}

impl<C: Connector> ConnectionGuard<C> {
    /// Build a disconnected guard.
    pub fn new(
        endpoint: BackendEndpoint,
        connector: C,
        backoff: Duration,
        reconnect: ReconnectPolicy,
    ) -> Self {
        Self {
            endpoint,
            connector,
            backoff,
            reconnect,
            client: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Endpoint the guard connects to.
    pub const fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    /// Backend kind label of the connector.
    pub fn kind(&self) -> &'static str {
        self.connector.kind()
    }

    /// Whether a live handle is held. Never blocks.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Establish the handle if missing, retrying until `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connect`] carrying the most recent connection failure.
    pub fn ensure_connected(&self, deadline: Deadline) -> BridgeResult<()> {
        let mut slot = self.lock();
        self.establish(&mut slot, deadline).map(|_| ())
    }

    /// Run `call` against the live handle with exclusive access.
    ///
    /// A missing handle gets a single connection attempt first.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connect`] when no handle could be established and
    /// [`BridgeError::Backend`] wrapping the adapter's failure otherwise.
    pub fn with_client<T>(
        &self,
        operation: &'static str,
        torrent_id: Option<&TorrentId>,
        call: impl FnOnce(&mut C::Client) -> ClientResult<T>,
    ) -> BridgeResult<T> {
        let mut slot = self.lock();
        let client = self.establish(&mut slot, Deadline::expired())?;
        call(client).map_err(|source| {
            if source.is_connection() && self.reconnect == ReconnectPolicy::OnConnectionLoss {
                warn!(
                    endpoint = %self.endpoint.label(),
                    operation,
                    error = ?source,
                    "backend connection lost; discarding handle"
                );
                *slot = None;
                self.connected.store(false, Ordering::Release);
            }
            BridgeError::Backend {
                operation,
                torrent_id: torrent_id.cloned(),
                source,
            }
        })
    }

    /// Drop the live handle, if any.
    pub fn disconnect(&self) {
        let mut slot = self.lock();
        if slot.take().is_some() {
            debug!(endpoint = %self.endpoint.label(), "backend handle released");
        }
        self.connected.store(false, Ordering::Release);
    }

    fn lock(&self) -> MutexGuard<'_, Option<C::Client>> {
        match self.client.lock() {
            Ok(slot) => slot,
            Err(poisoned) => {
                warn!(
                    endpoint = %self.endpoint.label(),
                    "backend call panicked; discarding handle"
                );
                let mut slot = poisoned.into_inner();
                *slot = None;
                self.connected.store(false, Ordering::Release);
                self.client.clear_poison();
                slot
            }
        }
    }

    fn establish<'slot>(
        &self,
        slot: &'slot mut Option<C::Client>,
        deadline: Deadline,
    ) -> BridgeResult<&'slot mut C::Client> {
        let client = match slot.take() {
            Some(client) => client,
            None => {
                let client = self.connect_until(deadline)?;
                self.connected.store(true, Ordering::Release);
                client
            }
        };
        Ok(slot.insert(client))
    }

    fn connect_until(&self, deadline: Deadline) -> BridgeResult<C::Client> {
        let label = self.endpoint.label();
        let kind = self.connector.kind();
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            debug!(
                endpoint = %label,
                backend = kind,
                attempt = attempts,
                "connecting to backend"
            );
            match self.connector.connect(&self.endpoint) {
                Ok(client) => {
                    info!(
                        endpoint = %label,
                        backend = kind,
                        attempts,
                        "backend connection established"
                    );
                    return Ok(client);
                }
                Err(source) => {
                    let retry_at = Instant::now().checked_add(self.backoff);
                    if retry_at.is_none_or(|at| deadline.has_passed_at(at)) {
                        warn!(
                            endpoint = %label,
                            backend = kind,
                            attempts,
                            error = ?source,
                            "backend connection deadline reached"
                        );
                        return Err(BridgeError::Connect {
                            endpoint: label,
                            attempts,
                            source,
                        });
                    }
                    debug!(
                        endpoint = %label,
                        attempt = attempts,
                        backoff_ms = u64::try_from(self.backoff.as_millis()).unwrap_or(u64::MAX),
                        error = ?source,
                        "backend connection failed; retrying"
                    );
                    thread::sleep(self.backoff);
                }
            }
        }
    }
}
