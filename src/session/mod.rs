//! Upstream session
//!
//! - [`machine`]: connection lifecycle, polling, telemetry, color commands
//! - [`runner`]: drives a core over a WebSocket
//! - [`scheduler`]: the single timer queue
//! - [`state`]: session state and timing rules

pub mod machine;
pub mod runner;
pub mod scheduler;
pub mod state;

pub use machine::{Action, Completion, SessionCore, SessionSettings, TimerEvent};
pub use runner::run;
pub use scheduler::{Scheduler, TimerHandle};
pub use state::{ConnectionState, SessionState};
