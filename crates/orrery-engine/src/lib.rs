//! Producer thread, snapshot cache and time controller for Orrery.
//!
//! [`TimeController`] is the consumer-facing handle: it serves snapshots in
//! order from a bounded queue fed by the [`FutureProducer`] thread, keeps a
//! rolling [`StateCache`] window, and moves aged snapshots into the
//! [`Archive`](orrery_archive::Archive) so the consumer can rewind to any
//! past timestep or fast-forward past the computed frontier.
//!
//! ```text
//! Consumer                 TimeController              orrery-producer
//!     |                         |                            |
//!     |--next_state()---------->| Case A: recv_timeout() <---| try_send()
//!     |                         |   cache.push / flush       | pre-buffer
//!     |                         | Case B: cache.get()        | block thread
//!     |                         | Case C: archive.read()     |   (K history, M steps)
//!     |<--StateFrame------------|                            |
//!     |--seek(t, progress, cancel)                           |
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod cache;
pub mod config;
pub mod controller;
pub mod metrics;
pub mod producer;
pub mod seek;

pub use block::{compute_block, BlockOutput};
pub use cache::StateCache;
pub use config::{
    ArchiveLocation, BackpressureConfig, ConfigError, EngineConfig, PredictorPolicy, QueueConfig,
};
pub use controller::{ControllerState, EngineError, ShutdownReport, StateFrame, TimeController};
pub use metrics::EngineMetrics;
pub use producer::{FutureProducer, ProducerParams, ProducerPhase, ProducerReport};
pub use seek::{CancellationToken, SeekOutcome, SeekProgress};
