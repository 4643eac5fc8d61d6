//! Scripted stand-ins for the resource manager and node manager protocols,
//! so the control loops can be driven through exact response sequences.

use std::collections::{HashSet, VecDeque};

use crate::common::error::error;
use crate::rm::{
    AllocateResponse, Container, ContainerId, ContainerRequest, ContainerState, ContainerStatus,
    FinalStatus, JobClient, JobId, JobReport, JobState, JobSubmission, LaunchContext,
    MasterClient, NodeClient, Resource, RmFuture,
};

pub fn report(state: JobState, final_status: FinalStatus) -> JobReport {
    JobReport {
        state,
        final_status,
    }
}

pub fn container(id: u32) -> Container {
    Container {
        id: format!("container-{id}"),
        host: format!("node-{id}"),
        capability: Resource::new(64, 1),
    }
}

pub fn completion(id: u32, exit_code: i32) -> ContainerStatus {
    ContainerStatus {
        container_id: format!("container-{id}"),
        state: ContainerState::Complete,
        exit_code,
    }
}

pub fn grants(containers: &[Container]) -> AllocateResponse {
    AllocateResponse {
        allocated: containers.to_vec(),
        completed: vec![],
    }
}

/// Client-side manager fake: fixed job id and maximum capability, scripted
/// report sequence. When the script runs out, the job stays RUNNING.
pub struct ScriptedJobClient {
    pub job_id: JobId,
    pub maximum_capability: Resource,
    pub reports: VecDeque<JobReport>,
    pub submitted: Vec<JobSubmission>,
    pub reject_submission: Option<String>,
    /// Fail this many leading `job_report` calls before the script applies.
    pub report_errors: usize,
    pub fail_kill: bool,
    pub report_calls: usize,
    pub kill_calls: usize,
}

impl ScriptedJobClient {
    pub fn new(job_id: &str, maximum_capability: Resource) -> Self {
        Self {
            job_id: job_id.to_string(),
            maximum_capability,
            reports: VecDeque::new(),
            submitted: Vec::new(),
            reject_submission: None,
            report_errors: 0,
            fail_kill: false,
            report_calls: 0,
            kill_calls: 0,
        }
    }
}

impl Default for ScriptedJobClient {
    fn default() -> Self {
        Self::new("job-1", Resource::new(8192, 8))
    }
}

impl JobClient for ScriptedJobClient {
    fn create_job<'a>(&'a mut self) -> RmFuture<'a, (JobId, Resource)> {
        let response = (self.job_id.clone(), self.maximum_capability);
        Box::pin(async move { Ok(response) })
    }

    fn submit_job<'a>(&'a mut self, spec: JobSubmission) -> RmFuture<'a, ()> {
        let result = match self.reject_submission.clone() {
            Some(reason) => Err(crate::Error::SubmissionRejected(reason)),
            None => {
                self.submitted.push(spec);
                Ok(())
            }
        };
        Box::pin(async move { result })
    }

    fn job_report<'a>(&'a mut self, _job_id: &JobId) -> RmFuture<'a, JobReport> {
        self.report_calls += 1;
        let result = if self.report_errors > 0 {
            self.report_errors -= 1;
            error("Manager unreachable".to_string())
        } else {
            Ok(self
                .reports
                .pop_front()
                .unwrap_or(report(JobState::Running, FinalStatus::Undefined)))
        };
        Box::pin(async move { result })
    }

    fn kill_job<'a>(&'a mut self, _job_id: &JobId) -> RmFuture<'a, ()> {
        self.kill_calls += 1;
        let result = if self.fail_kill {
            error("Kill request failed".to_string())
        } else {
            Ok(())
        };
        Box::pin(async move { result })
    }
}

/// Coordinator-side manager fake with a scripted allocate sequence. Running
/// past the script means the loop polled more often than the test expected.
#[derive(Default)]
pub struct ScriptedMasterClient {
    pub responses: VecDeque<AllocateResponse>,
    pub registered: bool,
    pub requests: Vec<ContainerRequest>,
    pub allocate_calls: usize,
    pub unregistered: Option<FinalStatus>,
}

impl MasterClient for ScriptedMasterClient {
    fn register_master<'a>(
        &'a mut self,
        _host: &str,
        _port: u16,
        _tracking_url: &str,
    ) -> RmFuture<'a, ()> {
        self.registered = true;
        Box::pin(async move { Ok(()) })
    }

    fn add_container_request<'a>(&'a mut self, request: ContainerRequest) -> RmFuture<'a, ()> {
        assert!(self.registered, "container request before registration");
        self.requests.push(request);
        Box::pin(async move { Ok(()) })
    }

    fn allocate<'a>(&'a mut self, _progress: f32) -> RmFuture<'a, AllocateResponse> {
        self.allocate_calls += 1;
        let response = self
            .responses
            .pop_front()
            .expect("allocate called more times than scripted");
        Box::pin(async move { Ok(response) })
    }

    fn unregister_master<'a>(
        &'a mut self,
        status: FinalStatus,
        _message: &str,
        _tracking_url: &str,
    ) -> RmFuture<'a, ()> {
        self.unregistered = Some(status);
        Box::pin(async move { Ok(()) })
    }
}

/// Node manager fake that records every launch; hosts listed in
/// `fail_hosts` refuse to start their container.
#[derive(Default)]
pub struct RecordingNodeClient {
    pub launched: Vec<ContainerId>,
    pub contexts: Vec<(ContainerId, LaunchContext)>,
    pub fail_hosts: HashSet<String>,
}

impl NodeClient for RecordingNodeClient {
    fn start_container<'a>(
        &'a mut self,
        container: &Container,
        context: LaunchContext,
    ) -> RmFuture<'a, ()> {
        let result = if self.fail_hosts.contains(&container.host) {
            error(format!("Node manager on {} is unreachable", container.host))
        } else {
            self.launched.push(container.id.clone());
            self.contexts.push((container.id.clone(), context));
            Ok(())
        };
        Box::pin(async move { result })
    }
}
