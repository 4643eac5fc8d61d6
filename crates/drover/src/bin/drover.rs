use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use tokio::time::Instant;

use drover::client::monitor::{MonitorConfig, monitor_job};
use drover::client::stager::SharedDirStore;
use drover::client::submit::{SubmitSpec, submit_job};
use drover::common::cli::{MasterOpts, RootOptions, SubCommand, SubmitOpts, WorkerOpts};
use drover::common::env::artifact_from_env;
use drover::common::setup::setup_logging;
use drover::master::run_master;
use drover::rm::connection::{NodeSession, RmSession};
use drover::worker::run_worker;

const EXIT_BAD_ARGUMENTS: i32 = -1;
const EXIT_FATAL: i32 = 1;
const EXIT_UNSUCCESSFUL: i32 = 2;

/// Submits the job and monitors it to completion.
/// Returns whether the job finished successfully.
async fn command_submit(opts: &SubmitOpts, spec: SubmitSpec) -> anyhow::Result<bool> {
    let client_start = Instant::now();

    let mut rm = RmSession::connect(&opts.rm_address).await?;
    let store = SharedDirStore::new(opts.store_root.clone());

    let job_id = submit_job(&mut rm, &store, &spec).await?;
    log::info!("Submitted job {job_id}");

    let config = MonitorConfig::new(client_start, Duration::from_millis(opts.timeout));
    Ok(monitor_job(&mut rm, &job_id, &config).await?)
}

async fn command_master(opts: &MasterOpts) -> anyhow::Result<()> {
    let artifact = artifact_from_env()?;
    let config = opts.to_config(artifact)?;

    let mut rm = RmSession::connect(&opts.rm_address).await?;
    let mut nm = NodeSession::new(opts.nm_port);
    run_master(&mut rm, &mut nm, &config).await?;
    Ok(())
}

fn command_worker(opts: &WorkerOpts) -> anyhow::Result<()> {
    run_worker(&opts.input)?;
    Ok(())
}

fn fatal(context: &str, error: anyhow::Error) -> ! {
    log::error!("Error running {context}: {error:?}");
    std::process::exit(EXIT_FATAL);
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let top_opts = match RootOptions::try_parse() {
        Ok(opts) => opts,
        Err(error) => {
            let _ = error.print();
            let code = match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_BAD_ARGUMENTS,
            };
            std::process::exit(code);
        }
    };

    setup_logging(top_opts.common.debug);

    match top_opts.subcmd {
        SubCommand::Submit(opts) => {
            // Validate the resource asks before contacting the cluster.
            let spec = match opts.to_spec() {
                Ok(spec) => spec,
                Err(error) => {
                    eprintln!("{error}");
                    std::process::exit(EXIT_BAD_ARGUMENTS);
                }
            };
            match command_submit(&opts, spec).await {
                Ok(true) => log::info!("Job completed successfully"),
                Ok(false) => {
                    log::error!("Job failed to complete successfully");
                    std::process::exit(EXIT_UNSUCCESSFUL);
                }
                Err(error) => fatal("submit", error),
            }
        }
        SubCommand::Master(opts) => {
            if let Err(error) = command_master(&opts).await {
                fatal("master", error);
            }
        }
        SubCommand::Worker(opts) => {
            if let Err(error) = command_worker(&opts) {
                fatal("worker", error);
            }
        }
    }
}
