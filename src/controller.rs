//! # Controller link
//!
//! The controller sends free-form text over one TCP stream. The first ASCII
//! digit of each chunk is an admission code; reserved codes and chunks
//! without digits leave the state alone. The first digit received starts the
//! simulation exactly once, even when its code is reserved.
//!
//! The listener ends quietly on end-of-stream or a read error: by then the
//! simulation runs on its own.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;

use crate::error::WorkshopError;
use crate::journal::Observe;
use crate::state_machine::{AdmissionCell, AdmissionState};

const CHUNK_SIZE: usize = 512;

/// First ASCII decimal digit in `chunk`, as a number.
pub fn extract_code(chunk: &[u8]) -> Option<u8> {
    chunk.iter().find(|b| b.is_ascii_digit()).map(|b| b - b'0')
}

/// Single-fire latch moving the workshop from "waiting" to "running".
#[derive(Debug, Default)]
pub struct StartLatch {
    fired: AtomicBool,
}

impl StartLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the first caller only.
    pub fn fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Opens the controller stream. Failure here is fatal for the process.
pub async fn connect(addr: &str) -> Result<TcpStream, WorkshopError> {
    TcpStream::connect(addr)
        .await
        .map_err(|source| WorkshopError::Connect {
            addr: addr.to_string(),
            source,
        })
}

/// Applies one chunk to `cell`. Returns the accepted state, if any.
pub fn handle_chunk(
    chunk: &[u8],
    cell: &AdmissionCell,
    observer: &dyn Observe,
) -> Option<AdmissionState> {
    let code = extract_code(chunk)?;
    let state = AdmissionState::from_code(code);
    if let Some(change) = cell.apply(code) {
        tracing::info!(from = %change.from, to = %change.to, "admission state changed");
        observer.on_state_change(&change);
    }
    state
}

/// Reads admission codes from `reader` until the stream ends.
///
/// `on_start` runs once, right after the first chunk carrying a digit has
/// been handled.
pub async fn listen<R, F>(
    mut reader: R,
    cell: &AdmissionCell,
    observer: &dyn Observe,
    latch: &StartLatch,
    on_start: F,
) where
    R: AsyncRead + Unpin,
    F: FnOnce(),
{
    let mut on_start = Some(on_start);
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("controller closed the stream");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "controller stream failed");
                break;
            }
        };

        let chunk = &buf[..n];
        handle_chunk(chunk, cell, observer);
        if extract_code(chunk).is_some()
            && latch.fire()
            && let Some(start) = on_start.take()
        {
            start();
        }
    }
}
