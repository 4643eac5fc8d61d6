use crate::master::MasterConfig;
use crate::rm::{ARTIFACT_NAME, LOG_DIR_VAR, LaunchContext};
use crate::Map;

/// Builds the launch context shared by every worker container: the staged
/// binary as the single local resource, the worker environment and the
/// worker command line with output redirected into the container log
/// directory.
pub fn worker_launch_context(config: &MasterConfig) -> LaunchContext {
    let mut resources = Map::new();
    if let Some(artifact) = &config.artifact {
        resources.insert(ARTIFACT_NAME.to_string(), artifact.clone());
    }

    let mut env = config.worker_env.clone();
    // The localized artifact lands in the container working directory, so
    // the worker is resolvable relative to ".".
    let inherited = std::env::var("PATH").unwrap_or_default();
    env.insert("PATH".to_string(), format!("./:{inherited}"));

    let command = format!(
        "./{ARTIFACT_NAME} worker --input {} \
         1> {LOG_DIR_VAR}/worker.stdout 2> {LOG_DIR_VAR}/worker.stderr",
        config.worker_input
    );

    LaunchContext {
        resources,
        env,
        commands: vec![command],
    }
}
