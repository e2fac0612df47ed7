// colorbridge - Bridge library
// Configuration, upstream messages and the session state machine

pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod session;

pub use config::Config;
pub use error::SessionError;
pub use message::{Inbound, Outbound};
pub use session::{SessionCore, SessionSettings};
