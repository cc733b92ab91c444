//! Library components of the publication runner.

pub mod logging;
pub mod publish;
