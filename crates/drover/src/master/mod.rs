//! The in-cluster coordinator: registers with the resource manager, requests
//! worker containers, launches each granted container on its node manager and
//! drains completion notifications until every worker has finished.

pub mod launcher;

use std::time::Duration;

use crate::Map;
use crate::rm::{
    AllocateResponse, ArtifactReference, Container, ContainerRequest, FinalStatus, MasterClient,
    NodeClient, Resource,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Coordinator-side configuration, assembled from the CLI and the artifact
/// environment contract.
pub struct MasterConfig {
    pub container_resources: Resource,
    pub num_containers: u32,
    pub priority: i32,
    pub artifact: Option<ArtifactReference>,
    /// Pass-through environment for the worker processes.
    pub worker_env: Map<String, String>,
    /// Input file analyzed by each worker.
    pub worker_input: String,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not all requested containers have been granted yet.
    Allocating,
    /// Fully allocated; waiting for the remaining completions.
    Draining,
    /// Every requested container has reported completion.
    Finished,
}

/// Loop-local allocation state, advanced exactly once per poll cycle.
///
/// Completions are counted from the very first cycle: workers may finish
/// while later containers are still being allocated, and a deferred count
/// would make the drain phase wait forever for notifications that already
/// happened.
pub struct AllocationProgress {
    total: u64,
    allocated: u64,
    launched: u64,
    completed: u64,
}

impl AllocationProgress {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            allocated: 0,
            launched: 0,
            completed: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.completed >= self.total {
            Phase::Finished
        } else if self.allocated >= self.total {
            Phase::Draining
        } else {
            Phase::Allocating
        }
    }

    /// Records one allocate response and returns the containers that should
    /// be launched. Grants above the requested total are abandoned.
    pub fn observe(&mut self, response: AllocateResponse) -> Vec<Container> {
        let mut to_launch = Vec::new();
        for container in response.allocated {
            if self.allocated >= self.total {
                log::warn!(
                    "Abandoning container {} granted above the requested count of {}",
                    container.id,
                    self.total
                );
                continue;
            }
            self.allocated += 1;
            to_launch.push(container);
        }

        for status in response.completed {
            self.completed += 1;
            log::info!(
                "Container {} reported {:?} with exit code {} ({}/{} completed)",
                status.container_id,
                status.state,
                status.exit_code,
                self.completed,
                self.total
            );
        }

        to_launch
    }

    pub fn on_launched(&mut self) {
        self.launched += 1;
    }

    /// Completion fraction reported to the manager as allocate progress.
    pub fn fraction_completed(&self) -> f32 {
        self.completed as f32 / self.total as f32
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn launched(&self) -> u64 {
        self.launched
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }
}

/// Main coordinator loop. Single-threaded polling: the fixed sleep between
/// allocate calls is the only wait, and each allocate call doubles as the
/// heartbeat expected by the resource manager.
pub async fn run_master(
    rm: &mut dyn MasterClient,
    nm: &mut dyn NodeClient,
    config: &MasterConfig,
) -> crate::Result<()> {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    rm.register_master(&host, 0, "").await?;
    log::info!(
        "Registered with the resource manager from {host}, requesting {} containers",
        config.num_containers
    );

    // All requests are identical and issued up front.
    let request = ContainerRequest {
        capability: config.container_resources,
        priority: config.priority,
    };
    for _ in 0..config.num_containers {
        rm.add_container_request(request).await?;
    }

    let context = launcher::worker_launch_context(config);
    let mut progress = AllocationProgress::new(config.num_containers as u64);

    loop {
        let response = rm.allocate(progress.fraction_completed()).await?;
        for container in progress.observe(response) {
            log::info!(
                "Launching container {} on {} ({}/{} allocated)",
                container.id,
                container.host,
                progress.allocated(),
                config.num_containers
            );
            // Best-effort launch: a failure is logged and skipped, no
            // replacement slot is requested.
            match nm.start_container(&container, context.clone()).await {
                Ok(()) => progress.on_launched(),
                Err(error) => log::error!(
                    "Failed to launch container {} on {}: {error}",
                    container.id,
                    container.host
                ),
            }
        }

        if progress.phase() == Phase::Finished {
            break;
        }
        tokio::time::sleep(config.poll_interval).await;
    }

    log::info!("All {} containers completed", progress.completed());
    rm.unregister_master(FinalStatus::Succeeded, "", "").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rm::Visibility;
    use crate::tests::utils::{
        RecordingNodeClient, ScriptedMasterClient, completion, container, grants,
    };
    use derive_builder::Builder;

    #[derive(Builder)]
    #[builder(pattern = "owned", build_fn(name = "finish"))]
    struct Setup {
        #[builder(default = "3")]
        num_containers: u32,
        #[builder(default = "Resource::new(64, 1)")]
        container_resources: Resource,
        #[builder(default)]
        artifact: Option<ArtifactReference>,
    }

    impl SetupBuilder {
        fn build(self) -> MasterConfig {
            let setup = self.finish().unwrap();
            MasterConfig {
                container_resources: setup.container_resources,
                num_containers: setup.num_containers,
                priority: 0,
                artifact: setup.artifact,
                worker_env: Map::default(),
                worker_input: "/data/bookings.csv".to_string(),
                poll_interval: DEFAULT_POLL_INTERVAL,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn allocates_launches_and_drains_to_completion() {
        // Grants arrive as [1, 0, 2]; completions as [0, 1, 2] afterwards.
        let mut rm = ScriptedMasterClient::default();
        rm.responses = vec![
            grants(&[container(0)]),
            AllocateResponse::default(),
            grants(&[container(1), container(2)]),
            AllocateResponse {
                allocated: vec![],
                completed: vec![completion(0, 0)],
            },
            AllocateResponse {
                allocated: vec![],
                completed: vec![completion(1, 0), completion(2, 0)],
            },
        ]
        .into();
        let mut nm = RecordingNodeClient::default();

        run_master(&mut rm, &mut nm, &SetupBuilder::default().build())
            .await
            .unwrap();

        assert_eq!(nm.launched.len(), 3);
        assert_eq!(rm.allocate_calls, 5);
        assert_eq!(rm.requests.len(), 3);
        assert!(rm.requests.iter().all(|r| r.capability == Resource::new(64, 1)));
        assert_eq!(rm.unregistered, Some(FinalStatus::Succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn completions_during_allocation_are_counted() {
        // The first two workers complete before the third is even granted.
        let mut rm = ScriptedMasterClient::default();
        rm.responses = vec![
            grants(&[container(0), container(1)]),
            AllocateResponse {
                allocated: vec![],
                completed: vec![completion(0, 0), completion(1, 0)],
            },
            AllocateResponse {
                allocated: vec![container(2)],
                completed: vec![completion(2, 0)],
            },
        ]
        .into();
        let mut nm = RecordingNodeClient::default();

        run_master(&mut rm, &mut nm, &SetupBuilder::default().build())
            .await
            .unwrap();

        assert_eq!(nm.launched.len(), 3);
        assert_eq!(rm.allocate_calls, 3);
        assert_eq!(rm.unregistered, Some(FinalStatus::Succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn excess_grants_are_never_launched() {
        let mut rm = ScriptedMasterClient::default();
        rm.responses = vec![
            grants(&[container(0), container(1), container(2), container(3)]),
            AllocateResponse {
                allocated: vec![],
                completed: vec![completion(0, 0), completion(1, 0), completion(2, 0)],
            },
        ]
        .into();
        let mut nm = RecordingNodeClient::default();

        run_master(&mut rm, &mut nm, &SetupBuilder::default().build())
            .await
            .unwrap();

        assert_eq!(nm.launched.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_is_skipped_without_compensation() {
        let mut rm = ScriptedMasterClient::default();
        rm.responses = vec![
            grants(&[container(0), container(1), container(2)]),
            AllocateResponse {
                allocated: vec![],
                completed: vec![completion(1, 0), completion(2, 0), completion(0, -1)],
            },
        ]
        .into();
        let mut nm = RecordingNodeClient::default();
        nm.fail_hosts.insert(container(0).host);

        run_master(&mut rm, &mut nm, &SetupBuilder::default().build())
            .await
            .unwrap();

        // One launch failed; no replacement container was requested.
        assert_eq!(nm.launched.len(), 2);
        assert_eq!(rm.requests.len(), 3);
        assert_eq!(rm.unregistered, Some(FinalStatus::Succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn launch_context_carries_the_artifact() {
        let artifact = ArtifactReference {
            uri: "/store/bookings/job-1/drover".to_string(),
            size_bytes: 13,
            timestamp_ms: 1_700_000_000_000,
            visibility: Visibility::Public,
        };
        let config = SetupBuilder::default()
            .num_containers(1)
            .artifact(Some(artifact.clone()))
            .build();

        let mut rm = ScriptedMasterClient::default();
        rm.responses = vec![
            grants(&[container(0)]),
            AllocateResponse {
                allocated: vec![],
                completed: vec![completion(0, 0)],
            },
        ]
        .into();
        let mut nm = RecordingNodeClient::default();

        run_master(&mut rm, &mut nm, &config).await.unwrap();

        let (_, context) = &nm.contexts[0];
        assert_eq!(context.resources[crate::rm::ARTIFACT_NAME], artifact);
        assert!(context.commands[0].starts_with("./drover worker"));
    }

    #[test]
    fn phase_transitions_follow_the_counts() {
        let mut progress = AllocationProgress::new(2);
        assert_eq!(progress.phase(), Phase::Allocating);

        progress.observe(grants(&[container(0)]));
        assert_eq!(progress.phase(), Phase::Allocating);

        progress.observe(grants(&[container(1)]));
        assert_eq!(progress.phase(), Phase::Draining);

        progress.observe(AllocateResponse {
            allocated: vec![],
            completed: vec![completion(0, 0), completion(1, 0)],
        });
        assert_eq!(progress.phase(), Phase::Finished);
        assert_eq!(progress.allocated(), 2);
        assert_eq!(progress.completed(), 2);
    }
}
