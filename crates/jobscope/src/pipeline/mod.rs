pub mod error;
pub mod runner;

pub use error::{PipelineError, PipelineFailure};
pub use runner::{ExtractionOutcome, ExtractionPipeline};
