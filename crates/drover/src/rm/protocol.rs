use serde::{Deserialize, Serialize};

use crate::rm::{
    AllocateResponse, Container, ContainerRequest, FinalStatus, JobId, JobReport, JobSubmission,
    LaunchContext, Resource,
};

// Messages client/coordinator -> resource manager
#[allow(clippy::large_enum_variant)]
#[derive(Serialize, Deserialize, Debug)]
pub enum ToManagerMessage {
    CreateJob,
    SubmitJob(JobSubmission),
    JobReport(JobId),
    KillJob(JobId),
    RegisterMaster {
        host: String,
        port: u16,
        tracking_url: String,
    },
    AddContainerRequest(ContainerRequest),
    Allocate {
        progress: f32,
    },
    UnregisterMaster {
        status: FinalStatus,
        message: String,
        tracking_url: String,
    },
}

// Messages resource manager -> client/coordinator
#[derive(Serialize, Deserialize, Debug)]
pub enum FromManagerMessage {
    JobCreated {
        job_id: JobId,
        maximum_capability: Resource,
    },
    Submitted,
    Report(JobReport),
    Killed,
    Registered,
    RequestAdded,
    Allocation(AllocateResponse),
    Unregistered,
    Error(String),
}

// Messages coordinator -> node manager
#[allow(clippy::large_enum_variant)]
#[derive(Serialize, Deserialize, Debug)]
pub enum ToNodeMessage {
    StartContainer {
        container: Container,
        context: LaunchContext,
    },
}

// Messages node manager -> coordinator
#[derive(Serialize, Deserialize, Debug)]
pub enum FromNodeMessage {
    Started,
    Error(String),
}
