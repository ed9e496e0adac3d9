//! Pipeline components: work tracking, queues, worker pools and the orchestrator.

pub mod context;
pub mod counter;
pub mod dispatcher;
pub mod error_handler;
pub mod orchestrator;
pub mod reader;
pub mod scanner;

pub use context::{
    PipelineChannels, PipelineContext, PipelineStats, WorkerHandles, create_pipeline_channels,
};
pub use counter::{PendingPath, WorkCounter, WorkUnit};
pub use error_handler::{FirstError, check_run_result};
pub use orchestrator::{Archiver, RootRegistrar};
pub use reader::{ChunkOutcome, spawn_readers, stream_chunks};
pub use scanner::{ScannerQueues, spawn_scanners};
