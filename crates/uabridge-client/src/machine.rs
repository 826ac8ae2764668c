// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection state machine and cyclic IO loop.
//!
//! One [`IoBridge`] task owns one transport and drives it through the
//! connection lifecycle: connect, type discovery, a validation cycle, then
//! steady-state cyclic IO with bounded jitter. Faults route through a retry
//! ladder: linear backoff for ordinary errors, full client recreation after
//! a 10 s quarantine for severe ones (a transport that reported a severe
//! status must not be reused).
//!
//! Callers interact only through the [`BridgeHandle`]: blob exchange via the
//! shared buffers, read-only snapshots of statistics, transport state and
//! discovered layouts. There is no push notification of transient faults;
//! polling the snapshots is the observability surface.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use uabridge_codec::{TypeDb, TypeNode};
use uabridge_core::{CancelToken, StatusCode};

use crate::buffers::SharedIo;
use crate::config::BridgeConfig;
use crate::discovery::{resolve_cyclic_node, CyclicNode};
use crate::error::BridgeResult;
use crate::stats::BridgeStats;
use crate::transport::{AttributeValue, ClientState, ExtensionObject, UaTransport};
use crate::types::AttributeId;

/// Granularity of cooperative waits. Cancellation and transport polling both
/// happen at this slice size.
const POLL_SLICE: Duration = Duration::from_millis(10);

/// Throughput is reported once per this interval while cyclic IO runs.
const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Quarantine before a severe-errored client context is recreated.
const RECREATE_QUARANTINE: Duration = Duration::from_secs(10);

/// Cap on the linear retry backoff, in whole seconds.
const MAX_RETRY_STEPS: u32 = 10;

/// Linear retry delay: one second per consecutive failure, capped.
fn retry_delay(retries: u32) -> Duration {
    Duration::from_secs(u64::from(retries.min(MAX_RETRY_STEPS)))
}

// =============================================================================
// BridgeState
// =============================================================================

/// State of the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BridgeState {
    /// Awaiting start.
    #[default]
    Idle,

    /// Allocating the client context and wiring callbacks.
    Initializing,

    /// Blocking connect attempt in progress.
    Connecting,

    /// Running type discovery for the write and read nodes.
    ReadingTypes,

    /// One validation read/write pass before declaring the connection live.
    FirstCycle,

    /// Steady-state cyclic IO.
    CyclicIo,

    /// A fault occurred; disconnect requested, retry bookkeeping updated.
    Faulted,

    /// Waiting for channel and session to report closed.
    Disconnecting,

    /// Backing off before the next connect attempt.
    WaitingRetry,

    /// Severe error: quarantining, then discarding the client context.
    Recreating,

    /// Terminal; entered only through explicit shutdown.
    Dead,
}

impl BridgeState {
    /// Returns `true` if cyclic IO is running.
    #[inline]
    pub fn is_cyclic_io_running(&self) -> bool {
        matches!(self, Self::CyclicIo)
    }

    /// Returns `true` if the machine is recovering from a fault.
    #[inline]
    pub fn is_recovering(&self) -> bool {
        matches!(
            self,
            Self::Faulted | Self::Disconnecting | Self::WaitingRetry | Self::Recreating
        )
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Connecting => write!(f, "Connecting"),
            Self::ReadingTypes => write!(f, "ReadingTypes"),
            Self::FirstCycle => write!(f, "FirstCycle"),
            Self::CyclicIo => write!(f, "CyclicIo"),
            Self::Faulted => write!(f, "Faulted"),
            Self::Disconnecting => write!(f, "Disconnecting"),
            Self::WaitingRetry => write!(f, "WaitingRetry"),
            Self::Recreating => write!(f, "Recreating"),
            Self::Dead => write!(f, "Dead"),
        }
    }
}

// =============================================================================
// Published snapshots
// =============================================================================

/// Discovery results published for caller threads.
///
/// Replaced wholesale after a successful discovery, never mutated in place:
/// callers holding an `Arc` snapshot keep a consistent layout across
/// reconnects.
#[derive(Debug, Default)]
struct Published {
    write_symbols: Option<Arc<TypeNode>>,
    read_symbols: Option<Arc<TypeNode>>,
    type_db: TypeDb,
}

// =============================================================================
// BridgeHandle
// =============================================================================

/// Caller-facing handle to a running bridge task.
///
/// All methods are non-blocking beyond a short lock hold; the cyclic network
/// IO happens entirely outside any lock callers can contend on.
pub struct BridgeHandle {
    shared: Arc<SharedIo>,
    stats: Arc<RwLock<BridgeStats>>,
    published: Arc<RwLock<Published>>,
    state: Arc<RwLock<BridgeState>>,
    client_state: Arc<RwLock<ClientState>>,
    token: CancelToken,
    task: tokio::task::JoinHandle<()>,
}

impl BridgeHandle {
    /// Returns the current machine state.
    pub fn state(&self) -> BridgeState {
        *self.state.read()
    }

    /// Returns `true` iff the machine is in steady-state cyclic IO.
    pub fn is_cyclic_io_running(&self) -> bool {
        self.state().is_cyclic_io_running()
    }

    /// Returns the transport's own state triple for diagnostics.
    pub fn client_state(&self) -> ClientState {
        *self.client_state.read()
    }

    /// Returns a snapshot of the runtime statistics.
    pub fn stats(&self) -> BridgeStats {
        self.stats.read().clone()
    }

    /// Replaces the write blob; transmitted on the next cycle.
    ///
    /// Returns the status of the previous cyclic write (one cycle stale).
    pub fn set_outputs(&self, data: &[u8]) -> StatusCode {
        self.shared.set_outputs(data)
    }

    /// Copies out the last blob read from the server.
    pub fn get_inputs(&self) -> (Vec<u8>, StatusCode) {
        self.shared.get_inputs()
    }

    /// Copies out the current write blob (readback).
    pub fn get_outputs(&self) -> (Vec<u8>, StatusCode) {
        self.shared.get_outputs()
    }

    /// Returns the discovered layout of the write node, once available.
    pub fn write_symbols(&self) -> Option<Arc<TypeNode>> {
        self.published.read().write_symbols.clone()
    }

    /// Returns the discovered layout of the read node, once available.
    pub fn read_symbols(&self) -> Option<Arc<TypeNode>> {
        self.published.read().read_symbols.clone()
    }

    /// Returns a snapshot of the per-connection type cache.
    pub fn type_db(&self) -> TypeDb {
        self.published.read().type_db.clone()
    }

    /// Returns a clone of the task's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Requests shutdown and waits for the task to unwind.
    ///
    /// Disconnect is attempted best-effort; the task reacts within one
    /// polling slice.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}

impl fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeHandle")
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// IoBridge
// =============================================================================

/// The bridge task: owns the transport and runs the state machine.
///
/// Created via [`IoBridge::spawn`], which validates the configuration and
/// starts the task on the current tokio runtime. The factory closure is
/// invoked for the initial client context and again whenever a severe error
/// forces recreation.
pub struct IoBridge<T, F> {
    config: BridgeConfig,
    factory: F,
    transport: Option<T>,

    state: BridgeState,
    shared_state: Arc<RwLock<BridgeState>>,
    shared: Arc<SharedIo>,
    stats: Arc<RwLock<BridgeStats>>,
    published: Arc<RwLock<Published>>,
    client_state: Arc<RwLock<ClientState>>,
    token: CancelToken,

    write_node: Option<CyclicNode>,
    read_node: Option<CyclicNode>,

    last_error: StatusCode,
    retries: u32,
    cycle_started: Instant,
    state_entered: Instant,
    stats_ticker: Instant,
    stats_last_cycles: u64,
}

impl<T, F> IoBridge<T, F>
where
    T: UaTransport + Sync + 'static,
    F: FnMut(&BridgeConfig) -> T + Send + Sync + 'static,
{
    /// Validates the configuration and spawns the bridge task.
    ///
    /// # Errors
    ///
    /// Fails eagerly on invalid configuration; transport and discovery
    /// faults after this point are handled by the retry ladder, never
    /// surfaced here.
    pub fn spawn(config: BridgeConfig, factory: F) -> BridgeResult<BridgeHandle> {
        config.validate()?;

        let token = CancelToken::new();
        let shared = Arc::new(SharedIo::new());
        let stats = Arc::new(RwLock::new(BridgeStats::new()));
        let published = Arc::new(RwLock::new(Published::default()));
        let shared_state = Arc::new(RwLock::new(BridgeState::Idle));
        let client_state = Arc::new(RwLock::new(ClientState::default()));

        let now = Instant::now();
        let bridge = IoBridge {
            config,
            factory,
            transport: None,
            state: BridgeState::Idle,
            shared_state: Arc::clone(&shared_state),
            shared: Arc::clone(&shared),
            stats: Arc::clone(&stats),
            published: Arc::clone(&published),
            client_state: Arc::clone(&client_state),
            token: token.clone(),
            write_node: None,
            read_node: None,
            last_error: StatusCode::GOOD,
            retries: 0,
            cycle_started: now,
            state_entered: now,
            stats_ticker: now,
            stats_last_cycles: 0,
        };

        let task = tokio::spawn(bridge.run());

        Ok(BridgeHandle {
            shared,
            stats,
            published,
            state: shared_state,
            client_state,
            token,
            task,
        })
    }

    async fn run(mut self) {
        info!(endpoint = %self.config.endpoint, "IO bridge task started");
        // Spawning is the external start request.
        self.set_state(BridgeState::Initializing);

        while !self.token.is_cancelled() {
            self.step().await;
            self.refresh_client_state();
        }

        // Best-effort disconnect on shutdown.
        if let Some(transport) = self.transport.as_mut() {
            let _ = transport.disconnect().await;
        }
        self.set_state(BridgeState::Dead);
        self.refresh_client_state();
        info!(endpoint = %self.config.endpoint, "IO bridge task terminated");
    }

    async fn step(&mut self) {
        match self.state {
            BridgeState::Idle | BridgeState::Dead => self.pause(POLL_SLICE).await,
            BridgeState::Initializing => self.initialize(),
            BridgeState::Connecting => self.connect().await,
            BridgeState::ReadingTypes => self.read_types().await,
            BridgeState::FirstCycle => self.first_cycle().await,
            BridgeState::CyclicIo => self.cyclic_io().await,
            BridgeState::Faulted => self.fault().await,
            BridgeState::Disconnecting => self.disconnecting().await,
            BridgeState::WaitingRetry => self.waiting_retry().await,
            BridgeState::Recreating => self.recreating().await,
        }
    }

    // =========================================================================
    // States
    // =========================================================================

    fn initialize(&mut self) {
        let mut transport = (self.factory)(&self.config);
        let endpoint = self.config.endpoint.clone();
        transport.set_state_callback(Box::new(move |state| {
            trace!(endpoint = %endpoint, state = %state, "transport state change");
        }));
        self.transport = Some(transport);
        debug!(endpoint = %self.config.endpoint, "client context initialized");
        self.set_state(BridgeState::Connecting);
    }

    async fn connect(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            self.set_state(BridgeState::Initializing);
            return;
        };
        info!(endpoint = %self.config.endpoint, "starting to connect");

        let status = transport
            .connect(&self.config.endpoint, &self.config.user_token)
            .await;
        if status.is_good() {
            // Discovered layouts from the previous session are stale now.
            self.published.write().type_db.clear();
            self.set_state(BridgeState::ReadingTypes);
        } else {
            error!(
                endpoint = %self.config.endpoint,
                status = %status,
                "connect failed"
            );
            self.last_error = status;
            self.set_state(BridgeState::Faulted);
        }
    }

    async fn read_types(&mut self) {
        info!(endpoint = %self.config.endpoint, "connected, reading type definitions");
        {
            let mut stats = self.stats.write();
            stats.reconnects += 1;
            stats.cycles_since_connect = 0;
        }
        self.stats_last_cycles = 0;

        let Some(transport) = self.transport.as_mut() else {
            self.set_state(BridgeState::Initializing);
            return;
        };

        let write_node = match resolve_cyclic_node(
            transport,
            self.config.namespace,
            &self.config.write_node,
            self.config.write_encoding.as_deref(),
        )
        .await
        {
            Ok(node) => node,
            Err(err) => {
                error!(node = %self.config.write_node, error = %err, "write node discovery failed");
                self.last_error = err.status_code();
                self.set_state(BridgeState::Faulted);
                return;
            }
        };

        let read_node = match resolve_cyclic_node(
            transport,
            self.config.namespace,
            &self.config.read_node,
            self.config.read_encoding.as_deref(),
        )
        .await
        {
            Ok(node) => node,
            Err(err) => {
                error!(node = %self.config.read_node, error = %err, "read node discovery failed");
                self.last_error = err.status_code();
                self.set_state(BridgeState::Faulted);
                return;
            }
        };

        // Seed the exchange with the initial values so the first write
        // carries a layout-correct blob.
        self.shared.seed(
            write_node.initial_value.clone(),
            read_node.initial_value.clone(),
        );

        // Build-then-publish: swap the finished layouts in one go.
        {
            let write_symbols = Arc::new(write_node.symbols.clone());
            let read_symbols = Arc::new(read_node.symbols.clone());
            let mut published = self.published.write();
            for symbols in [&write_symbols, &read_symbols] {
                if !symbols.info.type_name.is_empty() {
                    published
                        .type_db
                        .insert(symbols.info.type_name.clone(), Arc::clone(symbols));
                }
            }
            published.write_symbols = Some(write_symbols);
            published.read_symbols = Some(read_symbols);
        }

        self.stats.write().last_connected = Some(Utc::now());
        self.stats_ticker = Instant::now();
        self.write_node = Some(write_node);
        self.read_node = Some(read_node);
        self.set_state(BridgeState::FirstCycle);
    }

    async fn first_cycle(&mut self) {
        info!(endpoint = %self.config.endpoint, "types resolved, trying first read/write cycle");
        let status = self.rw_pass().await;
        if status.is_good() {
            self.retries = 0;
            self.stats.write().last_connected = Some(Utc::now());
            self.stats_ticker = Instant::now();
            self.cycle_started = Instant::now();
            info!(endpoint = %self.config.endpoint, "first cycle succeeded, starting cyclic IO");
            self.set_state(BridgeState::CyclicIo);
        } else {
            error!(endpoint = %self.config.endpoint, status = %status, "first cycle failed");
            self.last_error = status;
            self.set_state(BridgeState::Faulted);
        }
    }

    async fn cyclic_io(&mut self) {
        let now = Instant::now();
        self.stats.write().last_cycle = now - self.cycle_started;
        self.cycle_started = now;

        let status = self.rw_pass().await;
        if !status.is_good() {
            error!(endpoint = %self.config.endpoint, status = %status, "cyclic exchange failed");
            self.last_error = status;
            self.set_state(BridgeState::Faulted);
            return;
        }

        {
            let mut stats = self.stats.write();
            if stats.cycles_since_connect == 0 {
                info!(endpoint = %self.config.endpoint, "cyclic IO running");
            }
            stats.cycles_total += 1;
            stats.cycles_since_connect += 1;
        }
        self.report_throughput();

        // Wait out the remainder of the cycle, polling the transport in
        // small slices. A missed deadline starts the next tick immediately.
        let deadline = self.cycle_started + self.config.cycle_time;
        loop {
            if self.token.is_cancelled() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let slice = (deadline - now).min(POLL_SLICE);

            let Some(transport) = self.transport.as_mut() else {
                self.set_state(BridgeState::Initializing);
                return;
            };
            let iterate_started = Instant::now();
            let status = transport.run_iterate(slice).await;
            if !status.is_good() {
                error!(endpoint = %self.config.endpoint, status = %status, "transport fault during cycle wait");
                self.last_error = status;
                self.set_state(BridgeState::Faulted);
                return;
            }
            // Sleep out whatever the transport did not consume, so the loop
            // does not spin the CPU.
            let spent = iterate_started.elapsed();
            if spent < slice {
                tokio::time::sleep(slice - spent).await;
            }
        }
    }

    async fn fault(&mut self) {
        warn!(
            endpoint = %self.config.endpoint,
            status = %self.last_error,
            "connection faulted, disconnecting"
        );
        if let Some(transport) = self.transport.as_mut() {
            let _ = transport.disconnect().await;
        }
        self.retries += 1;
        self.state_entered = Instant::now();
        self.set_state(BridgeState::Disconnecting);
    }

    async fn disconnecting(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            self.set_state(BridgeState::WaitingRetry);
            return;
        };
        // Let the transport finish its teardown before reconnecting.
        let _ = transport.run_iterate(POLL_SLICE).await;
        if transport.state().is_fully_closed() {
            self.set_state(BridgeState::WaitingRetry);
        } else {
            self.pause(POLL_SLICE).await;
        }
    }

    async fn waiting_retry(&mut self) {
        if self.last_error.is_severe() {
            error!(
                endpoint = %self.config.endpoint,
                status = %self.last_error,
                "severe error, client context will be recreated"
            );
            self.set_state(BridgeState::Recreating);
            return;
        }

        let delay = retry_delay(self.retries);
        if self.state_entered.elapsed() >= delay {
            info!(endpoint = %self.config.endpoint, retries = self.retries, "retry wait done, reconnecting");
            self.set_state(BridgeState::Connecting);
        } else {
            self.pause(POLL_SLICE).await;
        }
    }

    async fn recreating(&mut self) {
        // Quarantine counts from the fault, matching the retry bookkeeping.
        if self.state_entered.elapsed() >= RECREATE_QUARANTINE {
            warn!(endpoint = %self.config.endpoint, "deleting client context after severe error");
            self.transport = None;
            info!(endpoint = %self.config.endpoint, "recreating client and reconnecting");
            self.set_state(BridgeState::Initializing);
        } else {
            self.pause(POLL_SLICE).await;
        }
    }

    // =========================================================================
    // Cyclic exchange
    // =========================================================================

    /// One write+read pass. Returns the first not-good status, preferring
    /// the write failure.
    async fn rw_pass(&mut self) -> StatusCode {
        let Some(transport) = self.transport.as_mut() else {
            return StatusCode::BAD_UNEXPECTED_ERROR;
        };
        let (Some(write_node), Some(read_node)) =
            (self.write_node.as_ref(), self.read_node.as_ref())
        else {
            return StatusCode::BAD_UNEXPECTED_ERROR;
        };

        // Write: skipped while no value has been staged yet.
        let mut write_status = StatusCode::GOOD;
        let outputs = self.shared.outputs_snapshot();
        if !outputs.is_empty() {
            let value = ExtensionObject::new(write_node.wire_type_id().clone(), outputs);
            write_status = transport.write_attribute(&write_node.node_id, value).await;
            self.shared.set_write_status(write_status);
            if !write_status.is_good() {
                warn!(node = %write_node.name, status = %write_status, "cyclic write failed");
            }
        }

        // Read: only scalar extension-object values are exchangeable.
        let read_status = match transport
            .read_attribute(&read_node.node_id, AttributeId::Value)
            .await
        {
            Ok(AttributeValue::Value(eo)) => {
                self.shared.store_inputs(eo.body);
                StatusCode::GOOD
            }
            Ok(_) => {
                warn!(node = %read_node.name, "cyclic read returned a non-serializable value");
                StatusCode::BAD_ENCODING_ERROR
            }
            Err(status) => {
                warn!(node = %read_node.name, status = %status, "cyclic read failed");
                status
            }
        };
        self.shared.set_read_status(read_status);

        if !write_status.is_good() {
            return write_status;
        }
        read_status
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn set_state(&mut self, next: BridgeState) {
        if self.state != next {
            debug!(
                endpoint = %self.config.endpoint,
                from = %self.state,
                to = %next,
                lasterr = %self.last_error,
                "state change"
            );
            self.state = next;
            *self.shared_state.write() = next;
        }
    }

    fn refresh_client_state(&self) {
        let snapshot = self
            .transport
            .as_ref()
            .map(UaTransport::state)
            .unwrap_or_default();
        *self.client_state.write() = snapshot;
    }

    /// Token-aware sleep used by all non-cyclic waits.
    async fn pause(&self, duration: Duration) {
        if self.token.is_cancelled() {
            return;
        }
        tokio::time::sleep(duration).await;
    }

    fn report_throughput(&mut self) {
        let elapsed = self.stats_ticker.elapsed();
        if elapsed < REPORT_INTERVAL {
            return;
        }
        let stats = self.stats.read().clone();
        let cycles = stats.cycles_since_connect.saturating_sub(self.stats_last_cycles);
        let elapsed_ms = elapsed.as_millis().max(1) as u64;
        let per_second = cycles * 1000 / elapsed_ms;
        let ms_per_cycle = if cycles > 0 { elapsed_ms / cycles } else { 0 };
        info!(
            endpoint = %self.config.endpoint,
            cycles_per_second = per_second,
            ms_per_cycle = ms_per_cycle,
            configured_ms = self.config.cycle_time.as_millis() as u64,
            uptime = ?stats.uptime(),
            connected = ?stats.connected_for(),
            "connection throughput"
        );
        self.stats_last_cycles = stats.cycles_since_connect;
        self.stats_ticker = Instant::now();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_is_linear_and_capped() {
        assert_eq!(retry_delay(0), Duration::ZERO);
        assert_eq!(retry_delay(1), Duration::from_secs(1));
        assert_eq!(retry_delay(3), Duration::from_secs(3));
        assert_eq!(retry_delay(10), Duration::from_secs(10));
        assert_eq!(retry_delay(50), Duration::from_secs(10));
    }

    #[test]
    fn test_state_predicates() {
        assert!(BridgeState::CyclicIo.is_cyclic_io_running());
        assert!(!BridgeState::FirstCycle.is_cyclic_io_running());

        assert!(BridgeState::Faulted.is_recovering());
        assert!(BridgeState::WaitingRetry.is_recovering());
        assert!(BridgeState::Recreating.is_recovering());
        assert!(!BridgeState::CyclicIo.is_recovering());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(BridgeState::Idle.to_string(), "Idle");
        assert_eq!(BridgeState::CyclicIo.to_string(), "CyclicIo");
        assert_eq!(BridgeState::WaitingRetry.to_string(), "WaitingRetry");
    }
}
