//! Captive-portal setup: protocol parsing, state machine and session driver

pub mod machine;
pub mod protocol;
mod session;

pub use machine::{SetupMachine, SetupOutcome, Step};
pub use protocol::{classify, LineFilter, SetupEvent};
pub use session::ProvisioningSession;
