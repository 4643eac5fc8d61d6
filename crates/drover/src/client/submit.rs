use std::path::PathBuf;

use crate::Map;
use crate::client::capability::negotiate;
use crate::client::stager::{ArtifactStore, StageSource};
use crate::common::env::{
    DROVER_ARTIFACT_LENGTH, DROVER_ARTIFACT_PATH, DROVER_ARTIFACT_TIMESTAMP,
};
use crate::rm::{
    ARTIFACT_NAME, ArtifactReference, JobClient, JobId, JobSubmission, LOG_DIR_VAR, LaunchContext,
    Resource,
};

/// Everything the client needs to build one job record.
pub struct SubmitSpec {
    pub name: String,
    pub priority: i32,
    pub queue: String,
    pub master_resources: Resource,
    pub artifact_path: PathBuf,
    pub container_resources: Resource,
    pub num_containers: u32,
}

/// Creates a job, stages the artifact and submits the job record.
///
/// Staging failures and manager rejections are fatal; no retry is attempted.
pub async fn submit_job(
    rm: &mut dyn JobClient,
    store: &dyn ArtifactStore,
    spec: &SubmitSpec,
) -> crate::Result<JobId> {
    let (job_id, maximum_capability) = rm.create_job().await?;
    log::info!(
        "Created job {job_id}, cluster maximum capability is {} MB / {} vcores",
        maximum_capability.memory_mb,
        maximum_capability.vcores
    );

    let capability = negotiate(spec.master_resources, maximum_capability);

    let destination = format!("{}/{}/{}", spec.name, job_id, ARTIFACT_NAME);
    let artifact = store.stage(StageSource::LocalFile(&spec.artifact_path), &destination)?;

    let submission = JobSubmission {
        name: spec.name.clone(),
        capability,
        priority: spec.priority,
        queue: spec.queue.clone(),
        launch_context: master_launch_context(&artifact, spec),
    };

    log::info!("Submitting job {job_id} to the resource manager");
    rm.submit_job(submission).await?;
    Ok(job_id)
}

/// Launch context of the coordinator: the staged binary as its single local
/// resource, the artifact env contract and the coordinator command line.
fn master_launch_context(artifact: &ArtifactReference, spec: &SubmitSpec) -> LaunchContext {
    let mut resources = Map::new();
    resources.insert(ARTIFACT_NAME.to_string(), artifact.clone());

    let mut env = Map::new();
    env.insert(DROVER_ARTIFACT_PATH.to_string(), artifact.uri.clone());
    env.insert(
        DROVER_ARTIFACT_LENGTH.to_string(),
        artifact.size_bytes.to_string(),
    );
    env.insert(
        DROVER_ARTIFACT_TIMESTAMP.to_string(),
        artifact.timestamp_ms.to_string(),
    );

    let command = format!(
        "./{ARTIFACT_NAME} master \
         --container-memory {} --container-vcores {} --num-containers {} --priority 0 \
         1> {LOG_DIR_VAR}/master.stdout 2> {LOG_DIR_VAR}/master.stderr",
        spec.container_resources.memory_mb, spec.container_resources.vcores, spec.num_containers
    );

    LaunchContext {
        resources,
        env,
        commands: vec![command],
    }
}
