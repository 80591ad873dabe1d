//! Multi-step Studio workflows.
//!
//! Both workflows are strict chains: each step consumes the previous step's output and the
//! first failure aborts the chain unmodified. Nothing is rolled back; when a chain aborts
//! mid-way, a `warn!` names the remote resources it left behind.

pub mod create;
pub mod finish;
pub mod poll;

pub use create::*;
pub use finish::*;
pub use poll::*;
