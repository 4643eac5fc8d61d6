//! Client-side view of the cluster resource manager and node manager
//! protocols. The traits below are the seams the control loops talk through;
//! `connection` provides the real wire implementations and tests substitute
//! scripted fakes.

pub mod connection;
pub mod protocol;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::Map;

pub type JobId = String;
pub type ContainerId = String;

/// Name under which the staged binary is localized into every container.
pub const ARTIFACT_NAME: &str = "drover";

/// Placeholder expanded by the node manager to the container's log directory.
pub const LOG_DIR_VAR: &str = "<LOG_DIR>";

/// A resource capability ask: memory plus virtual cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub memory_mb: u64,
    pub vcores: u32,
}

impl Resource {
    pub fn new(memory_mb: u64, vcores: u32) -> Self {
        Self { memory_mb, vcores }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    New,
    Submitted,
    Running,
    Finished,
    Failed,
    Killed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalStatus {
    Undefined,
    Succeeded,
    Failed,
    Killed,
}

/// Snapshot of a job's state, re-fetched on every poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub state: JobState,
    pub final_status: FinalStatus,
}

/// One request for an execution slot. Requests are fungible: no host
/// affinity, consumed exactly once when the manager grants a matching slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRequest {
    pub capability: Resource,
    pub priority: i32,
}

/// A granted execution slot. Ownership transfers to the coordinator, which
/// must launch it or explicitly abandon it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub host: String,
    pub capability: Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerState {
    Running,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub container_id: ContainerId,
    pub state: ContainerState,
    pub exit_code: i32,
}

/// One response of the non-blocking allocate call. Either list may be empty;
/// the relative order within each list is implementation-defined.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocateResponse {
    pub allocated: Vec<Container>,
    pub completed: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Application,
}

/// Location descriptor of an artifact staged into the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    pub uri: String,
    pub size_bytes: u64,
    pub timestamp_ms: u64,
    pub visibility: Visibility,
}

/// Everything a node manager needs to start one process: localized
/// resources, environment and the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchContext {
    pub resources: Map<String, ArtifactReference>,
    pub env: Map<String, String>,
    pub commands: Vec<String>,
}

/// A complete job record, immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubmission {
    pub name: String,
    pub capability: Resource,
    pub priority: i32,
    pub queue: String,
    pub launch_context: LaunchContext,
}

pub type RmFuture<'a, T> = Pin<Box<dyn Future<Output = crate::Result<T>> + 'a>>;

/// Client-side resource manager protocol: submit one job and track it.
pub trait JobClient {
    /// Asks the manager for a fresh job identifier. Also returns the
    /// cluster-advertised maximum capability, fetched once at startup.
    fn create_job<'a>(&'a mut self) -> RmFuture<'a, (JobId, Resource)>;

    /// Submits the job record. A rejection is fatal and surfaced as-is.
    fn submit_job<'a>(&'a mut self, spec: JobSubmission) -> RmFuture<'a, ()>;

    fn job_report<'a>(&'a mut self, job_id: &JobId) -> RmFuture<'a, JobReport>;

    fn kill_job<'a>(&'a mut self, job_id: &JobId) -> RmFuture<'a, ()>;
}

/// Coordinator-side resource manager protocol.
pub trait MasterClient {
    fn register_master<'a>(
        &'a mut self,
        host: &str,
        port: u16,
        tracking_url: &str,
    ) -> RmFuture<'a, ()>;

    fn add_container_request<'a>(&'a mut self, request: ContainerRequest) -> RmFuture<'a, ()>;

    /// Non-blocking allocate; each call doubles as the heartbeat expected by
    /// the manager.
    fn allocate<'a>(&'a mut self, progress: f32) -> RmFuture<'a, AllocateResponse>;

    fn unregister_master<'a>(
        &'a mut self,
        status: FinalStatus,
        message: &str,
        tracking_url: &str,
    ) -> RmFuture<'a, ()>;
}

/// Node manager protocol: start a worker process on a granted slot.
pub trait NodeClient {
    fn start_container<'a>(
        &'a mut self,
        container: &Container,
        context: LaunchContext,
    ) -> RmFuture<'a, ()>;
}
