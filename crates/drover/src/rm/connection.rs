use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio_util::codec::length_delimited::Builder;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::common::error::error;
use crate::rm::protocol::{FromManagerMessage, FromNodeMessage, ToManagerMessage, ToNodeMessage};
use crate::rm::{
    AllocateResponse, Container, ContainerRequest, FinalStatus, JobClient, JobId, JobReport,
    JobSubmission, LaunchContext, MasterClient, NodeClient, Resource, RmFuture,
};

const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

type Codec = Framed<TcpStream, LengthDelimitedCodec>;

pub fn make_protocol_builder() -> Builder {
    *LengthDelimitedCodec::builder()
        .little_endian()
        .max_frame_length(MAX_FRAME_SIZE)
}

/// Framed bincode connection to a manager service, typed by the message
/// pair flowing through it.
pub struct RmConnection<ReceiveMsg, SendMsg> {
    writer: SplitSink<Codec, Bytes>,
    reader: SplitStream<Codec>,
    _r: PhantomData<ReceiveMsg>,
    _s: PhantomData<SendMsg>,
}

impl<R: DeserializeOwned, S: Serialize> RmConnection<R, S> {
    pub async fn connect(address: &str) -> crate::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        let (writer, reader) = make_protocol_builder().new_framed(stream).split();
        Ok(Self {
            writer,
            reader,
            _r: Default::default(),
            _s: Default::default(),
        })
    }

    pub async fn send(&mut self, item: S) -> crate::Result<()> {
        let data = serialize_message(&item)?;
        self.writer.send(data).await?;
        Ok(())
    }

    pub async fn receive(&mut self) -> Option<crate::Result<R>> {
        self.reader.next().await.map(deserialize_message)
    }

    pub async fn send_and_receive(&mut self, item: S) -> crate::Result<R> {
        self.send(item).await?;
        match self.receive().await {
            Some(msg) => msg,
            None => error("Expected response was not received".into()),
        }
    }
}

fn serialize_message<S: Serialize>(item: &S) -> crate::Result<Bytes> {
    Ok(bincode::serialize(item)?.into())
}

fn deserialize_message<R: DeserializeOwned>(
    message: Result<BytesMut, std::io::Error>,
) -> crate::Result<R> {
    let message = message?;
    Ok(bincode::deserialize(&message)?)
}

pub type ManagerConnection = RmConnection<FromManagerMessage, ToManagerMessage>;
pub type NodeConnection = RmConnection<FromNodeMessage, ToNodeMessage>;

/// Live session with the resource manager. Implements both the client-side
/// and the coordinator-side protocol over one connection.
pub struct RmSession {
    connection: ManagerConnection,
}

impl RmSession {
    pub async fn connect(address: &str) -> crate::Result<Self> {
        log::debug!("Connecting to resource manager at {address}");
        Ok(Self {
            connection: ManagerConnection::connect(address).await?,
        })
    }
}

fn unexpected<T>(message: FromManagerMessage) -> crate::Result<T> {
    error(format!("Unexpected resource manager response: {message:?}"))
}

impl JobClient for RmSession {
    fn create_job<'a>(&'a mut self) -> RmFuture<'a, (JobId, Resource)> {
        Box::pin(async move {
            match self
                .connection
                .send_and_receive(ToManagerMessage::CreateJob)
                .await?
            {
                FromManagerMessage::JobCreated {
                    job_id,
                    maximum_capability,
                } => Ok((job_id, maximum_capability)),
                FromManagerMessage::Error(e) => error(e),
                msg => unexpected(msg),
            }
        })
    }

    fn submit_job<'a>(&'a mut self, spec: JobSubmission) -> RmFuture<'a, ()> {
        Box::pin(async move {
            match self
                .connection
                .send_and_receive(ToManagerMessage::SubmitJob(spec))
                .await?
            {
                FromManagerMessage::Submitted => Ok(()),
                FromManagerMessage::Error(e) => Err(crate::Error::SubmissionRejected(e)),
                msg => unexpected(msg),
            }
        })
    }

    fn job_report<'a>(&'a mut self, job_id: &JobId) -> RmFuture<'a, JobReport> {
        let message = ToManagerMessage::JobReport(job_id.clone());
        Box::pin(async move {
            match self.connection.send_and_receive(message).await? {
                FromManagerMessage::Report(report) => Ok(report),
                FromManagerMessage::Error(e) => error(e),
                msg => unexpected(msg),
            }
        })
    }

    fn kill_job<'a>(&'a mut self, job_id: &JobId) -> RmFuture<'a, ()> {
        let message = ToManagerMessage::KillJob(job_id.clone());
        Box::pin(async move {
            match self.connection.send_and_receive(message).await? {
                FromManagerMessage::Killed => Ok(()),
                FromManagerMessage::Error(e) => error(e),
                msg => unexpected(msg),
            }
        })
    }
}

impl MasterClient for RmSession {
    fn register_master<'a>(
        &'a mut self,
        host: &str,
        port: u16,
        tracking_url: &str,
    ) -> RmFuture<'a, ()> {
        let message = ToManagerMessage::RegisterMaster {
            host: host.to_string(),
            port,
            tracking_url: tracking_url.to_string(),
        };
        Box::pin(async move {
            match self.connection.send_and_receive(message).await? {
                FromManagerMessage::Registered => Ok(()),
                FromManagerMessage::Error(e) => error(e),
                msg => unexpected(msg),
            }
        })
    }

    fn add_container_request<'a>(&'a mut self, request: ContainerRequest) -> RmFuture<'a, ()> {
        Box::pin(async move {
            match self
                .connection
                .send_and_receive(ToManagerMessage::AddContainerRequest(request))
                .await?
            {
                FromManagerMessage::RequestAdded => Ok(()),
                FromManagerMessage::Error(e) => error(e),
                msg => unexpected(msg),
            }
        })
    }

    fn allocate<'a>(&'a mut self, progress: f32) -> RmFuture<'a, AllocateResponse> {
        Box::pin(async move {
            match self
                .connection
                .send_and_receive(ToManagerMessage::Allocate { progress })
                .await?
            {
                FromManagerMessage::Allocation(response) => Ok(response),
                FromManagerMessage::Error(e) => error(e),
                msg => unexpected(msg),
            }
        })
    }

    fn unregister_master<'a>(
        &'a mut self,
        status: FinalStatus,
        message: &str,
        tracking_url: &str,
    ) -> RmFuture<'a, ()> {
        let message = ToManagerMessage::UnregisterMaster {
            status,
            message: message.to_string(),
            tracking_url: tracking_url.to_string(),
        };
        Box::pin(async move {
            match self.connection.send_and_receive(message).await? {
                FromManagerMessage::Unregistered => Ok(()),
                FromManagerMessage::Error(e) => error(e),
                msg => unexpected(msg),
            }
        })
    }
}

/// Dials the node manager owning each container's host on a fixed port.
pub struct NodeSession {
    port: u16,
}

impl NodeSession {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl NodeClient for NodeSession {
    fn start_container<'a>(
        &'a mut self,
        container: &Container,
        context: LaunchContext,
    ) -> RmFuture<'a, ()> {
        let address = format!("{}:{}", container.host, self.port);
        let container = container.clone();
        Box::pin(async move {
            let mut connection = NodeConnection::connect(&address).await?;
            match connection
                .send_and_receive(ToNodeMessage::StartContainer { container, context })
                .await?
            {
                FromNodeMessage::Started => Ok(()),
                FromNodeMessage::Error(e) => error(e),
            }
        })
    }
}
