//! Shared test utilities for jobscope integration tests.
//!
//! - `TestHarness`: temp directories, a mock provider server and a
//!   dispatcher wired to both
//! - builders for job records and model replies

pub mod builders;
pub mod harness;

#[allow(unused_imports)]
pub use builders::*;
#[allow(unused_imports)]
pub use harness::TestHarness;
