//! # Sistema de Jobs
//!
//! Motor asíncrono para ejecutar cálculos diferidos sin bloquear las
//! conexiones HTTP.
//!
//! ```text
//! submit → JobQueue → WorkerPool → ResultStore + JobRegistry ← status/fetch
//! ```

pub mod gate;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod service;
pub mod storage;
pub mod types;

pub use gate::ReadinessGate;
pub use registry::{JobRecord, JobRegistry};
pub use service::JobService;
pub use storage::{FileResultStore, MemoryResultStore, ResultStore};
pub use types::{JobId, JobState, JobStatus, Task};
