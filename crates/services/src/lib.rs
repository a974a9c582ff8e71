#![forbid(unsafe_code)]

//! Assessment-taking session engine: loading, answer capture with debounced
//! persistence, countdown-driven auto-submit, and scoring on submission.

pub mod error;
pub mod session;

pub use assess_core::Clock;
pub use error::SessionError;
pub use session::{SessionController, SessionStatus, Ticker};
