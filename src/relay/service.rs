//! Communication service orchestrator
//!
//! Owns the status machine, the cancellation trio, and the per-cycle
//! dispatch between the pass-through and TLS relay strategies. Control
//! calls validate against the current status and are not synchronized
//! against each other; callers issue one control call at a time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error};
use openssl::ssl::SslAcceptor;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::common::{RelayError, Result};
use crate::pipe::DuplexPipe;

use super::status::StatusCell;
use super::{passthrough, secure, CancelScope, ConnectionStatus};

/// Default size of the TLS relay's stream read buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Transport relay between a socket-side pipe and a connection-side pipe.
///
/// Drives relay cycles bounded by `start`/`resume` and their pause, stop or
/// failure exit. The control methods are the asynchronous handles of the
/// contract: `start` and `resume` return once a cycle is launched, `pause`
/// and `stop` return once the in-flight cycle has fully unwound.
pub struct RelayService {
    inner: Arc<Inner>,
}

struct Inner {
    socket: DuplexPipe,
    connection: DuplexPipe,
    status: StatusCell,
    /// Connection-lifetime umbrella, owned by the enclosing connection.
    closed: CancellationToken,
    stopped: CancellationToken,
    /// Reallocated fresh at the start of every cycle.
    paused: Mutex<CancellationToken>,
    acceptor: Option<Arc<SslAcceptor>>,
    encryption_enabled: AtomicBool,
    buffer_size: AtomicUsize,
    cycle: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn complete_pipes(&self) {
        self.socket.complete();
        self.connection.complete();
    }
}

impl RelayService {
    /// Create a service bound to its two pipes, the enclosing connection's
    /// lifetime token and an optional server certificate.
    pub fn new(
        socket: DuplexPipe,
        connection: DuplexPipe,
        closed: CancellationToken,
        acceptor: Option<Arc<SslAcceptor>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                socket,
                connection,
                status: StatusCell::new(ConnectionStatus::ReadyToRun),
                closed,
                stopped: CancellationToken::new(),
                paused: Mutex::new(CancellationToken::new()),
                acceptor,
                encryption_enabled: AtomicBool::new(false),
                buffer_size: AtomicUsize::new(DEFAULT_BUFFER_SIZE),
                cycle: Mutex::new(None),
            }),
        }
    }

    /// Override the TLS relay's stream read buffer size for later cycles.
    pub fn set_buffer_size(&self, buffer_size: usize) {
        self.inner
            .buffer_size
            .store(buffer_size.max(1), Ordering::Release);
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.load()
    }

    /// Whether the next cycle will run the TLS relay.
    pub fn encryption_enabled(&self) -> bool {
        self.inner.encryption_enabled.load(Ordering::Acquire)
    }

    /// Choose the relay strategy for subsequent cycles. Enabling encryption
    /// with no certificate configured is a configuration error; the flag is
    /// left unchanged.
    pub fn set_encryption_enabled(&self, enabled: bool) -> Result<()> {
        if enabled && self.inner.acceptor.is_none() {
            return Err(RelayError::Config(
                "cannot enable encryption without a server certificate".to_string(),
            ));
        }
        self.inner.encryption_enabled.store(enabled, Ordering::Release);
        Ok(())
    }

    /// Launch the first relay cycle. Precondition: ready to run.
    pub async fn start(&self) -> Result<()> {
        if !self
            .inner
            .status
            .transition(ConnectionStatus::ReadyToRun, ConnectionStatus::Running)
        {
            return Err(invalid("start", self.inner.status.load()));
        }
        self.launch_cycle();
        Ok(())
    }

    /// Wind the current cycle down without closing the pipes, so a later
    /// `resume` picks up mid-connection. Precondition: running.
    pub async fn pause(&self) -> Result<()> {
        if self.inner.status.load() != ConnectionStatus::Running {
            return Err(invalid("pause", self.inner.status.load()));
        }
        self.inner.paused.lock().unwrap().cancel();
        self.inner.socket.input.cancel_pending_read();
        self.join_cycle().await;
        Ok(())
    }

    /// Stop permanently: fires the stop signal, unwinds any in-flight cycle
    /// and marks both ends of both pipes complete. Idempotent once stopped.
    pub async fn stop(&self) -> Result<()> {
        match self.inner.status.load() {
            ConnectionStatus::Stopped => return Ok(()),
            ConnectionStatus::ReadyToRun => {
                return Err(invalid("stop", ConnectionStatus::ReadyToRun))
            }
            ConnectionStatus::Running | ConnectionStatus::Paused => {}
        }

        self.inner.stopped.cancel();
        self.inner.socket.input.cancel_pending_read();
        self.join_cycle().await;

        // A paused service has no cycle in flight to run the completion
        // path; finish it here.
        if self.inner.status.load() != ConnectionStatus::Stopped {
            self.inner.complete_pipes();
            self.inner.status.store(ConnectionStatus::Stopped);
        }
        Ok(())
    }

    /// Launch a new cycle after a pause. A stopped service ignores the call:
    /// once stopped, stays stopped. Precondition otherwise: paused.
    pub async fn resume(&self) -> Result<()> {
        match self.inner.status.load() {
            ConnectionStatus::Stopped => return Ok(()),
            ConnectionStatus::Paused => {}
            other => return Err(invalid("continue", other)),
        }
        self.inner.status.store(ConnectionStatus::Running);
        self.launch_cycle();
        Ok(())
    }

    fn launch_cycle(&self) {
        // Fresh pause token per cycle; the previous cycle's fired token
        // must not pre-cancel this one.
        let paused = CancellationToken::new();
        *self.inner.paused.lock().unwrap() = paused.clone();

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(run_cycle(inner, paused));
        *self.inner.cycle.lock().unwrap() = Some(handle);
    }

    async fn join_cycle(&self) {
        let handle = self.inner.cycle.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                // The cycle task itself died; tear the connection down.
                error!("relay cycle task failed: {}", e);
                self.inner.closed.cancel();
                self.inner.complete_pipes();
                self.inner.status.store(ConnectionStatus::Stopped);
            }
        }
    }
}

async fn run_cycle(inner: Arc<Inner>, paused: CancellationToken) {
    let scope = CancelScope::compose(&inner.closed, &inner.stopped, &paused);

    // The previous cycle's wind-down may have left unconsumed read-cancels.
    inner.socket.input.clear_pending_cancel();
    inner.connection.input.clear_pending_cancel();

    let result = if inner.encryption_enabled.load(Ordering::Acquire) {
        match &inner.acceptor {
            Some(acceptor) => {
                secure::run(
                    &inner.socket,
                    &inner.connection,
                    acceptor,
                    inner.buffer_size.load(Ordering::Acquire),
                    &scope,
                )
                .await
            }
            // Guarded at configuration time; kept as a hard failure rather
            // than silently falling back to plaintext.
            None => Err(RelayError::Config(
                "encryption enabled without a server certificate".to_string(),
            )),
        }
    } else {
        passthrough::run(&inner.socket, &inner.connection, &scope).await
    };

    let failed = match &result {
        Ok(()) => false,
        Err(e) => {
            error!("relay cycle failed: {}", e);
            // Unexpected failure escalates to full connection teardown.
            inner.closed.cancel();
            true
        }
    };

    if !failed
        && paused.is_cancelled()
        && !inner.stopped.is_cancelled()
        && !inner.closed.is_cancelled()
    {
        debug!("relay cycle paused");
        inner.status.store(ConnectionStatus::Paused);
        return;
    }

    inner.complete_pipes();
    inner.status.store(ConnectionStatus::Stopped);
}

fn invalid(call: &'static str, from: ConnectionStatus) -> RelayError {
    RelayError::InvalidStateTransition { call, from }
}
