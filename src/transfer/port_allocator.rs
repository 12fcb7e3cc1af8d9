//! Module `port_allocator`
//!
//! Finds free TCP ports for passive-mode data channels.
//!
//! Two flavors are offered:
//! - [`find_open_port`] probes candidates by binding a throwaway listener and
//!   releasing it again. The caller has to re-bind the port afterwards.
//! - [`PortAllocator::reserve`] binds the real listener while holding a
//!   process-wide ledger lock and records the port as reserved until the
//!   returned [`PortReservation`] is dropped. Concurrent sessions therefore
//!   never receive the same port.

use log::{debug, info};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::TransferError;

type Ledger = Arc<Mutex<HashSet<u16>>>;

/// Returns the smallest port at or above `start` that can currently be bound on `host`.
///
/// Bind failures other than `AddrInUse` are treated as "not available" and
/// the scan simply moves on to the next candidate.
pub fn find_open_port(host: IpAddr, start: u16) -> Result<u16, TransferError> {
    (start.max(1)..=u16::MAX)
        .find(|&port| probe(host, port))
        .ok_or(TransferError::NoAvailablePort)
}

fn probe(host: IpAddr, port: u16) -> bool {
    match TcpListener::bind((host, port)) {
        Ok(_listener) => true,
        Err(e) if e.kind() == ErrorKind::AddrInUse => false,
        Err(e) => {
            debug!("Port {} not usable on {}: {}", port, host, e);
            false
        }
    }
}

/// Shared allocator for passive data ports.
///
/// Cloning is cheap; every clone shares the same ledger.
#[derive(Clone, Debug)]
pub struct PortAllocator {
    reserved: Ledger,
    range: RangeInclusive<u16>,
}

impl PortAllocator {
    /// Creates an allocator handing out ports from `min..=max`.
    pub fn new(min: u16, max: u16) -> Self {
        Self {
            reserved: Arc::new(Mutex::new(HashSet::new())),
            range: min.max(1)..=max,
        }
    }

    /// Binds a listener on the lowest free, unreserved port of the range.
    ///
    /// The ledger lock is held for the whole scan, so the check and the bind
    /// happen atomically with respect to other callers.
    pub fn reserve(&self, host: IpAddr) -> Result<(PortReservation, TcpListener), TransferError> {
        let mut reserved = self.ledger();

        for port in self.range.clone() {
            if reserved.contains(&port) {
                continue;
            }

            match TcpListener::bind(SocketAddr::new(host, port)) {
                Ok(listener) => {
                    reserved.insert(port);
                    info!("Reserved data port {} on {}", port, host);
                    let reservation = PortReservation {
                        port,
                        ledger: Arc::clone(&self.reserved),
                    };
                    return Ok((reservation, listener));
                }
                Err(e) if e.kind() == ErrorKind::AddrInUse => continue,
                Err(e) => {
                    debug!("Skipping data port {}: {}", port, e);
                }
            }
        }

        Err(TransferError::NoAvailablePort)
    }

    /// Returns whether `port` is currently held by a live reservation.
    pub fn is_reserved(&self, port: u16) -> bool {
        self.ledger().contains(&port)
    }

    /// Number of ports currently held.
    pub fn reserved_count(&self) -> usize {
        self.ledger().len()
    }

    fn ledger(&self) -> MutexGuard<'_, HashSet<u16>> {
        self.reserved.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps a data port out of circulation until dropped.
#[derive(Debug)]
pub struct PortReservation {
    port: u16,
    ledger: Ledger,
}

impl PortReservation {
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortReservation {
    fn drop(&mut self) {
        let mut reserved = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        reserved.remove(&self.port);
        debug!("Released data port {}", self.port);
    }
}
