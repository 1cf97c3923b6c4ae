use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::RuntimeError;
use crate::types::{ContainerDetails, RunningContainer, RuntimeEvent, RuntimeVersion};

pub mod docker;
pub use docker::DockerRuntime;

/// Stream of runtime events. `None` means the runtime closed the stream.
pub type EventStream = BoxStream<'static, Result<RuntimeEvent, RuntimeError>>;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Connectivity check.
    async fn version(&self) -> Result<RuntimeVersion, RuntimeError>;

    /// List the containers that are currently up.
    async fn list_running_containers(&self) -> Result<Vec<RunningContainer>, RuntimeError>;

    /// Inspect a single container by id.
    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError>;

    /// Subscribe to the live event stream.
    fn events(&self) -> EventStream;
}
