use std::path::PathBuf;

use clap::Parser;

use crate::Map;
use crate::client::submit::SubmitSpec;
use crate::master::{DEFAULT_POLL_INTERVAL, MasterConfig};
use crate::rm::{ArtifactReference, Resource};

#[derive(Parser)]
#[command(name = "drover", version, about = "Runs record-counting workers on a cluster")]
pub struct RootOptions {
    #[clap(flatten)]
    pub common: CommonOpts,

    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(clap::Args)]
pub struct CommonOpts {
    /// Use verbose (debug) logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(clap::Subcommand)]
pub enum SubCommand {
    /// Submit the job to the resource manager and monitor it to completion
    Submit(SubmitOpts),
    /// Run the in-cluster coordinator (started by the resource manager)
    Master(MasterOpts),
    /// Run the worker payload inside a container
    Worker(WorkerOpts),
}

#[derive(Parser)]
pub struct SubmitOpts {
    /// Address of the resource manager service
    #[arg(long, default_value = "localhost:8030")]
    pub rm_address: String,

    /// Root directory of the shared artifact store
    #[arg(long, default_value = "/srv/drover")]
    pub store_root: PathBuf,

    /// Application name
    #[arg(long, default_value = "drover")]
    pub name: String,

    /// Application priority
    #[arg(long, default_value_t = 0)]
    pub priority: i32,

    /// Resource manager queue in which the job is submitted
    #[arg(long, default_value = "default")]
    pub queue: String,

    /// Kill the job if it has not finished within this many milliseconds
    #[arg(long, default_value_t = 60_000)]
    pub timeout: u64,

    /// Memory in MB requested for the coordinator
    #[arg(long, default_value_t = 32, allow_hyphen_values = true)]
    pub master_memory: i64,

    /// Virtual cores requested for the coordinator
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    pub master_vcores: i64,

    /// Local path of the binary staged into the shared store
    #[arg(long)]
    pub artifact: PathBuf,

    /// Memory in MB requested per worker container
    #[arg(long, default_value_t = 32, allow_hyphen_values = true)]
    pub container_memory: i64,

    /// Virtual cores requested per worker container
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    pub container_vcores: i64,

    /// Number of worker containers to run
    #[arg(long, default_value_t = 1)]
    pub num_containers: i64,
}

impl SubmitOpts {
    /// Validates the resource asks before any cluster contact.
    pub fn to_spec(&self) -> crate::Result<SubmitSpec> {
        if self.master_memory < 0 {
            return Err(crate::Error::InvalidInput(format!(
                "Invalid memory specified for the coordinator: {}",
                self.master_memory
            )));
        }
        if self.master_vcores < 0 {
            return Err(crate::Error::InvalidInput(format!(
                "Invalid virtual cores specified for the coordinator: {}",
                self.master_vcores
            )));
        }
        if self.container_memory < 0 || self.container_vcores < 0 {
            return Err(crate::Error::InvalidInput(format!(
                "Invalid worker container resources: memory={}, vcores={}",
                self.container_memory, self.container_vcores
            )));
        }
        if self.num_containers < 1 {
            return Err(crate::Error::InvalidInput(format!(
                "Invalid number of worker containers: {}",
                self.num_containers
            )));
        }

        Ok(SubmitSpec {
            name: self.name.clone(),
            priority: self.priority,
            queue: self.queue.clone(),
            master_resources: Resource::new(self.master_memory as u64, self.master_vcores as u32),
            artifact_path: self.artifact.clone(),
            container_resources: Resource::new(
                self.container_memory as u64,
                self.container_vcores as u32,
            ),
            num_containers: self.num_containers as u32,
        })
    }
}

#[derive(Parser)]
pub struct MasterOpts {
    /// Address of the resource manager service
    #[arg(long, default_value = "localhost:8030")]
    pub rm_address: String,

    /// Port of the node manager service on every container host
    #[arg(long, default_value_t = 8041)]
    pub nm_port: u16,

    /// Memory in MB requested per worker container
    #[arg(long, default_value_t = 32, allow_hyphen_values = true)]
    pub container_memory: i64,

    /// Virtual cores requested per worker container
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    pub container_vcores: i64,

    /// Number of worker containers to run
    #[arg(long, default_value_t = 1)]
    pub num_containers: i64,

    /// Priority of the container requests
    #[arg(long, default_value_t = 0)]
    pub priority: i32,

    /// Input file analyzed by each worker
    #[arg(long, default_value = "/data/bookings.csv")]
    pub worker_input: String,
}

impl MasterOpts {
    pub fn to_config(&self, artifact: Option<ArtifactReference>) -> crate::Result<MasterConfig> {
        if self.container_memory < 0 || self.container_vcores < 0 {
            return Err(crate::Error::InvalidInput(format!(
                "Invalid worker container resources: memory={}, vcores={}",
                self.container_memory, self.container_vcores
            )));
        }
        if self.num_containers < 1 {
            return Err(crate::Error::InvalidInput(
                "Cannot run the coordinator with no containers".to_string(),
            ));
        }

        Ok(MasterConfig {
            container_resources: Resource::new(
                self.container_memory as u64,
                self.container_vcores as u32,
            ),
            num_containers: self.num_containers as u32,
            priority: self.priority,
            artifact,
            worker_env: Map::default(),
            worker_input: self.worker_input.clone(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }
}

#[derive(Parser)]
pub struct WorkerOpts {
    /// Input file with booking records
    #[arg(long)]
    pub input: PathBuf,
}
