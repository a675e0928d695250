//! Shared runtime plumbing for hub client binaries.

pub mod logging;
