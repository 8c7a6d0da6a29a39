//! Concurrent ingestion pipeline
//!
//! ```text
//! RecordSource ──load──▶ IngestOrchestrator ──submit──▶ dispatch queue
//!                                 │                          │
//!                          CompletionBarrier ◀──signal── Worker × W ──▶ PersistenceGateway
//! ```
//!
//! - [`source`]: where records come from
//! - [`gateway`]: where records go
//! - [`queue`]: bounded multi-consumer hand-off
//! - [`barrier`]: count-down of work units
//! - [`orchestrator`]: wiring, failure policy and the run report

pub mod barrier;
pub mod gateway;
pub mod orchestrator;
pub mod queue;
pub mod source;
pub mod types;
mod worker;

pub use barrier::{CompletionBarrier, WorkUnit};
pub use gateway::{GatewayError, PersistenceGateway};
pub use orchestrator::IngestOrchestrator;
pub use queue::{dispatch_queue, Dispatcher, QueueClosed, QueueReceiver};
pub use source::RecordSource;
pub use types::{IngestReport, RecordFailure, WorkerReport};
