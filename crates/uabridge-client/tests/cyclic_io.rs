// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Cyclic IO integration tests.
//!
//! These tests drive the full bridge (state machine, type discovery and the
//! cyclic exchange) against a scripted in-memory transport. All timing runs
//! on tokio's paused clock, so backoff and jitter scenarios are
//! deterministic and finish instantly in wall time.
//!
//! The simulated server exposes two structure types in namespace 4:
//!
//! - `HostType` (write node `HostToPlc`): `counter` Int32 + `payload`
//!   Byte[10], the 11-byte layout of the array scenarios.
//! - `PlcType` (read node `PlcToHost`): `status_word` DWORD (vendor numeric
//!   3003) + `temperature` Float.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use uabridge_client::{
    AttributeId, AttributeValue, BridgeConfig, ClientState, ExtensionObject, IoBridge, NodeClass,
    NodeId, NodeIdentifier, SecureChannelState, SessionState, StructureDefinition, StructureField,
    StructureType, UaTransport, UserToken,
};
use uabridge_codec::{ScalarKind, TypeKind};
use uabridge_core::StatusCode;

// =============================================================================
// Simulated server
// =============================================================================

const WRITE_NODE_ID: u32 = 101;
const READ_NODE_ID: u32 = 102;
const WRITE_EXPANDED_ID: u32 = 201;
const READ_EXPANDED_ID: u32 = 202;
const WRITE_ENCODING_ID: u32 = 301;

/// Initial value of the write node: counter 0, payload count 3, 3 zero bytes.
fn host_initial() -> Vec<u8> {
    let mut body = vec![0u8; 4];
    body.extend_from_slice(&3u32.to_le_bytes());
    body.extend_from_slice(&[0, 0, 0]);
    body
}

/// Initial value of the read node: status_word 0, temperature 0.0.
fn plc_initial() -> Vec<u8> {
    vec![0u8; 8]
}

fn host_type_definition() -> StructureDefinition {
    StructureDefinition {
        structure_type: StructureType::Structure,
        default_encoding_id: NodeId::string(4, "HostType.Binary"),
        fields: vec![
            StructureField::scalar("counter", NodeId::numeric(0, 6)),
            StructureField::array("payload", NodeId::numeric(0, 3), 10),
        ],
    }
}

fn plc_type_definition() -> StructureDefinition {
    StructureDefinition {
        structure_type: StructureType::Structure,
        default_encoding_id: NodeId::string(4, "PlcType.Binary"),
        fields: vec![
            StructureField::scalar("status_word", NodeId::numeric(3, 3003)),
            StructureField::scalar("temperature", NodeId::numeric(0, 10)),
        ],
    }
}

/// Shared behavior script and observation log of the simulated server.
#[derive(Default)]
struct ServerSim {
    connect_results: Mutex<VecDeque<StatusCode>>,
    connect_attempts: AtomicU32,
    connect_times: Mutex<Vec<Instant>>,
    transports_created: AtomicU32,
    read_value: Mutex<Vec<u8>>,
    written: Mutex<Vec<ExtensionObject>>,
    write_results: Mutex<VecDeque<StatusCode>>,
    fail_attribute_reads: Mutex<Option<StatusCode>>,
}

impl ServerSim {
    fn new() -> Arc<Self> {
        let sim = Self::default();
        *sim.read_value.lock().unwrap() = plc_initial();
        Arc::new(sim)
    }

    fn script_connect_failures(&self, failures: &[StatusCode]) {
        self.connect_results.lock().unwrap().extend(failures.iter().copied());
    }

    fn set_read_value(&self, body: Vec<u8>) {
        *self.read_value.lock().unwrap() = body;
    }

    fn fail_attribute_reads(&self, status: Option<StatusCode>) {
        *self.fail_attribute_reads.lock().unwrap() = status;
    }

    fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    fn written(&self) -> Vec<ExtensionObject> {
        self.written.lock().unwrap().clone()
    }
}

struct ScriptedTransport {
    sim: Arc<ServerSim>,
    connected: bool,
    last_status: StatusCode,
}

impl ScriptedTransport {
    fn new(sim: Arc<ServerSim>) -> Self {
        sim.transports_created.fetch_add(1, Ordering::SeqCst);
        Self {
            sim,
            connected: false,
            last_status: StatusCode::GOOD,
        }
    }
}

#[async_trait]
impl UaTransport for ScriptedTransport {
    async fn connect(&mut self, _endpoint: &str, _token: &UserToken) -> StatusCode {
        self.sim.connect_attempts.fetch_add(1, Ordering::SeqCst);
        self.sim.connect_times.lock().unwrap().push(Instant::now());
        let status = self
            .sim
            .connect_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StatusCode::GOOD);
        self.last_status = status;
        self.connected = status.is_good();
        status
    }

    async fn disconnect(&mut self) -> StatusCode {
        self.connected = false;
        StatusCode::GOOD
    }

    async fn run_iterate(&mut self, _timeout: Duration) -> StatusCode {
        StatusCode::GOOD
    }

    async fn read_attribute(
        &mut self,
        node: &NodeId,
        attribute: AttributeId,
    ) -> Result<AttributeValue, StatusCode> {
        if !self.connected {
            return Err(StatusCode::BAD_CONNECTION_CLOSED);
        }
        if let Some(status) = *self.sim.fail_attribute_reads.lock().unwrap() {
            return Err(status);
        }

        match (&node.identifier, attribute) {
            // Name resolution
            (NodeIdentifier::String(name), AttributeId::NodeId) => match name.as_str() {
                "HostToPlc" => Ok(AttributeValue::NodeId(NodeId::numeric(4, WRITE_NODE_ID))),
                "PlcToHost" => Ok(AttributeValue::NodeId(NodeId::numeric(4, READ_NODE_ID))),
                "HostToPlc.Encoding" => {
                    Ok(AttributeValue::NodeId(NodeId::numeric(4, WRITE_ENCODING_ID)))
                }
                _ => Err(StatusCode::BAD_NODE_ID_UNKNOWN),
            },

            // Variable attributes
            (NodeIdentifier::Numeric(WRITE_NODE_ID), AttributeId::DataType) => {
                Ok(AttributeValue::NodeId(NodeId::string(4, "HostType")))
            }
            (NodeIdentifier::Numeric(READ_NODE_ID), AttributeId::DataType) => {
                Ok(AttributeValue::NodeId(NodeId::string(4, "PlcType")))
            }
            (NodeIdentifier::Numeric(WRITE_NODE_ID | READ_NODE_ID), AttributeId::NodeClass) => {
                Ok(AttributeValue::NodeClass(NodeClass::Variable))
            }
            (NodeIdentifier::Numeric(WRITE_NODE_ID), AttributeId::Value) => {
                Ok(AttributeValue::Value(ExtensionObject::new(
                    NodeId::numeric(4, WRITE_EXPANDED_ID),
                    host_initial(),
                )))
            }
            (NodeIdentifier::Numeric(READ_NODE_ID), AttributeId::Value) => {
                Ok(AttributeValue::Value(ExtensionObject::new(
                    NodeId::numeric(4, READ_EXPANDED_ID),
                    self.sim.read_value.lock().unwrap().clone(),
                )))
            }

            // Type system
            (NodeIdentifier::String(name), AttributeId::DataTypeDefinition) => {
                match name.as_str() {
                    "HostType" => Ok(AttributeValue::DataTypeDefinition(host_type_definition())),
                    "PlcType" => Ok(AttributeValue::DataTypeDefinition(plc_type_definition())),
                    _ => Err(StatusCode::BAD_NODE_ID_UNKNOWN),
                }
            }

            _ => Err(StatusCode::BAD_NODE_ID_UNKNOWN),
        }
    }

    async fn write_attribute(&mut self, _node: &NodeId, value: ExtensionObject) -> StatusCode {
        if !self.connected {
            return StatusCode::BAD_CONNECTION_CLOSED;
        }
        self.sim.written.lock().unwrap().push(value);
        self.sim
            .write_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StatusCode::GOOD)
    }

    fn state(&self) -> ClientState {
        if self.connected {
            ClientState {
                channel: SecureChannelState::Open,
                session: SessionState::Activated,
                status: self.last_status,
            }
        } else {
            ClientState {
                channel: SecureChannelState::Closed,
                session: SessionState::Closed,
                status: self.last_status,
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn test_config() -> BridgeConfig {
    BridgeConfig::builder()
        .endpoint("opc.tcp://localhost:4840")
        .namespace(4)
        .write_node("HostToPlc")
        .read_node("PlcToHost")
        .cycle_time(Duration::from_millis(100))
        .build()
        .unwrap()
}

fn spawn_bridge(sim: &Arc<ServerSim>) -> uabridge_client::BridgeHandle {
    spawn_bridge_with(sim, test_config())
}

fn spawn_bridge_with(
    sim: &Arc<ServerSim>,
    config: BridgeConfig,
) -> uabridge_client::BridgeHandle {
    // Opt-in log output for debugging: RUST_LOG=debug cargo test ...
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let sim = Arc::clone(sim);
    IoBridge::spawn(config, move |_cfg| ScriptedTransport::new(Arc::clone(&sim))).unwrap()
}

/// Polls `cond` on the paused clock until it holds, panicking after
/// `timeout` of virtual time.
async fn wait_for(mut cond: impl FnMut() -> bool, timeout: Duration, what: &str) {
    let deadline = Instant::now() + timeout;
    while !cond() {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for: {}",
            what
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_bridge_reaches_cyclic_io_and_exchanges_blobs() {
    let sim = ServerSim::new();
    let handle = spawn_bridge(&sim);

    wait_for(
        || handle.is_cyclic_io_running(),
        Duration::from_secs(10),
        "cyclic IO running",
    )
    .await;

    // Outputs were seeded from the initial read, so the first write carries
    // the layout-correct initial blob tagged with the expanded encoding id.
    wait_for(
        || !sim.written().is_empty(),
        Duration::from_secs(2),
        "first cyclic write",
    )
    .await;
    let first = &sim.written()[0];
    assert_eq!(first.body, host_initial());
    assert_eq!(first.type_id, NodeId::numeric(4, WRITE_EXPANDED_ID));

    // Server-side value changes propagate into the read blob.
    let fresh = vec![0x11, 0x22, 0x33, 0x44, 0, 0, 0x80, 0x3F];
    sim.set_read_value(fresh.clone());
    wait_for(
        || handle.get_inputs().0 == fresh,
        Duration::from_secs(2),
        "read blob update",
    )
    .await;
    assert!(handle.get_inputs().1.is_good());

    // A staged output is transmitted on a following cycle.
    let mut outputs = 7i32.to_le_bytes().to_vec();
    outputs.extend_from_slice(&3u32.to_le_bytes());
    outputs.extend_from_slice(&[9, 8, 7]);
    handle.set_outputs(&outputs);
    wait_for(
        || sim.written().iter().any(|eo| eo.body == outputs),
        Duration::from_secs(2),
        "staged output written",
    )
    .await;

    let (readback, status) = handle.get_outputs();
    assert_eq!(readback, outputs);
    assert!(status.is_good());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_discovery_publishes_layouts() {
    let sim = ServerSim::new();
    let handle = spawn_bridge(&sim);

    wait_for(
        || handle.read_symbols().is_some(),
        Duration::from_secs(10),
        "layouts published",
    )
    .await;

    // Vendor numeric 3003 (DWORD) resolves to an unsigned 32-bit field.
    let read = handle.read_symbols().unwrap();
    assert_eq!(read.info.item_name, "PlcToHost");
    assert_eq!(read.info.type_name, "PlcType.Binary");
    let status_word = &read.children[0].info;
    assert_eq!(status_word.item_name, "status_word");
    assert_eq!(status_word.kind, TypeKind::Scalar(ScalarKind::UInt32));
    assert_eq!(status_word.data_size, 4);
    assert_eq!(status_word.type_name, "DWORD");
    assert_eq!(
        read.children[1].info.kind,
        TypeKind::Scalar(ScalarKind::Float)
    );

    let write = handle.write_symbols().unwrap();
    assert_eq!(write.children.len(), 2);
    let payload = &write.children[1].info;
    assert!(payload.is_array);
    assert_eq!(payload.array_dimensions, vec![10]);

    // Both layouts land in the per-connection type cache under their
    // encoding type names.
    let db = handle.type_db();
    assert!(db.get("HostType.Binary").is_some());
    assert!(db.get("PlcType.Binary").is_some());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_ten_cycles_complete_with_bounded_jitter() {
    let sim = ServerSim::new();
    let handle = spawn_bridge(&sim);

    wait_for(
        || handle.is_cyclic_io_running(),
        Duration::from_secs(10),
        "cyclic IO running",
    )
    .await;

    // Align to a cycle boundary before measuring.
    let c0 = handle.stats().cycles_total;
    wait_for(
        || handle.stats().cycles_total > c0,
        Duration::from_secs(2),
        "cycle boundary",
    )
    .await;

    let started = Instant::now();
    let base = handle.stats().cycles_total;
    wait_for(
        || handle.stats().cycles_total >= base + 10,
        Duration::from_secs(5),
        "ten cycles",
    )
    .await;
    let elapsed = started.elapsed();

    assert!(
        elapsed >= Duration::from_millis(950) && elapsed <= Duration::from_millis(1100),
        "ten 100ms cycles took {:?}",
        elapsed
    );
    assert_eq!(handle.stats().cycles_total, base + 10);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_fixed_encoding_identity_used_for_writes() {
    let sim = ServerSim::new();
    let config = BridgeConfig::builder()
        .endpoint("opc.tcp://localhost:4840")
        .namespace(4)
        .write_node("HostToPlc")
        .write_encoding("HostToPlc.Encoding")
        .read_node("PlcToHost")
        .cycle_time(Duration::from_millis(100))
        .build()
        .unwrap();
    let handle = spawn_bridge_with(&sim, config);

    wait_for(
        || !sim.written().is_empty(),
        Duration::from_secs(10),
        "first cyclic write",
    )
    .await;

    // The configured encoding node wins over the dynamic expanded id.
    assert_eq!(
        sim.written()[0].type_id,
        NodeId::numeric(4, WRITE_ENCODING_ID)
    );

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_nonfatal_connect_failures_back_off_linearly() {
    let sim = ServerSim::new();
    // Uncertain codes are failures, but not severe: the client is reused.
    sim.script_connect_failures(&[
        StatusCode::UNCERTAIN_INITIAL_VALUE,
        StatusCode::UNCERTAIN_INITIAL_VALUE,
        StatusCode::UNCERTAIN_INITIAL_VALUE,
    ]);
    let handle = spawn_bridge(&sim);

    wait_for(
        || sim.connect_attempts() >= 4,
        Duration::from_secs(30),
        "four connect attempts",
    )
    .await;

    let times = sim.connect_times.lock().unwrap().clone();
    let deltas: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();

    // Retry delays grow linearly with the consecutive-failure count and do
    // not reset until a first cycle succeeds.
    for (i, expected_secs) in [1u64, 2, 3].iter().enumerate() {
        let expected = Duration::from_secs(*expected_secs);
        assert!(
            deltas[i] >= expected && deltas[i] <= expected + Duration::from_millis(200),
            "retry delay {} was {:?}, expected about {:?}",
            i,
            deltas[i],
            expected
        );
    }

    // No severe status was involved, so the client context was never
    // recreated.
    assert_eq!(sim.transports_created.load(Ordering::SeqCst), 1);

    wait_for(
        || handle.is_cyclic_io_running(),
        Duration::from_secs(10),
        "recovery after backoff",
    )
    .await;

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_severe_error_routes_through_recreation() {
    let sim = ServerSim::new();
    sim.script_connect_failures(&[StatusCode::BAD_CONNECTION_CLOSED]);
    let handle = spawn_bridge(&sim);

    wait_for(
        || sim.connect_attempts() >= 2,
        Duration::from_secs(30),
        "reconnect after severe error",
    )
    .await;

    // The severe status forced a fresh client context after the fixed
    // quarantine; the retry never went straight back to Connecting.
    assert_eq!(sim.transports_created.load(Ordering::SeqCst), 2);
    let times = sim.connect_times.lock().unwrap().clone();
    let delta = times[1] - times[0];
    assert!(
        delta >= Duration::from_secs(10) && delta <= Duration::from_secs(11),
        "quarantine before recreation was {:?}",
        delta
    );

    wait_for(
        || handle.is_cyclic_io_running(),
        Duration::from_secs(10),
        "recovery after recreation",
    )
    .await;
    assert!(handle.client_state().channel == SecureChannelState::Open);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_discovery_failure_faults_connection() {
    let sim = ServerSim::new();
    sim.fail_attribute_reads(Some(StatusCode::BAD_NODE_ID_UNKNOWN));
    let handle = spawn_bridge(&sim);

    // Discovery cannot complete, so cyclic IO never starts and the machine
    // keeps cycling through the recovery states.
    wait_for(
        || sim.connect_attempts() >= 2,
        Duration::from_secs(60),
        "retry after discovery failure",
    )
    .await;
    assert!(!handle.is_cyclic_io_running());
    assert!(handle.read_symbols().is_none());

    // Once the type system answers again, the bridge heals itself.
    sim.fail_attribute_reads(None);
    wait_for(
        || handle.is_cyclic_io_running(),
        Duration::from_secs(60),
        "recovery after discovery failure",
    )
    .await;
    assert!(handle.read_symbols().is_some());
    assert!(handle.stats().reconnects >= 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_set_outputs_reports_previous_write_status() {
    let sim = ServerSim::new();
    let handle = spawn_bridge(&sim);

    wait_for(
        || handle.is_cyclic_io_running(),
        Duration::from_secs(10),
        "cyclic IO running",
    )
    .await;

    // While everything is healthy the previous write status is good.
    assert!(handle.set_outputs(&host_initial()).is_good());

    // Script one failing write, then observe the stale status through both
    // the readback and the next set_outputs call.
    sim.write_results
        .lock()
        .unwrap()
        .push_back(StatusCode::UNCERTAIN_INITIAL_VALUE);
    wait_for(
        || handle.get_outputs().1 == StatusCode::UNCERTAIN_INITIAL_VALUE,
        Duration::from_secs(5),
        "write failure visible",
    )
    .await;
    assert_eq!(
        handle.set_outputs(&host_initial()),
        StatusCode::UNCERTAIN_INITIAL_VALUE
    );

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_terminates_task() {
    let sim = ServerSim::new();
    let handle = spawn_bridge(&sim);

    wait_for(
        || handle.is_cyclic_io_running(),
        Duration::from_secs(10),
        "cyclic IO running",
    )
    .await;

    let token = handle.cancel_token();
    tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
        .await
        .expect("shutdown must unwind within one polling slice");
    assert!(token.is_cancelled());
}
