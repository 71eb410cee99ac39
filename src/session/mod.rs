//! Session
//!
//! Password grant session state machine.

pub mod password;
pub mod state;

pub use password::{AuthSession, DefaultAuthSession};
pub use state::SessionState;
