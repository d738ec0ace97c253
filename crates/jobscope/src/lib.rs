pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod extractor;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod protocol;
pub mod sanitize;
pub mod storage;

pub use config::{load_config, load_or_default, Config, ProviderKind};
pub use db::{Database, DatabaseError};
pub use error::{
    ConfigError, ExtractionError, FramingError, JobscopeError, Result, SchemaError, StorageError,
};
pub use extractor::{build_extractor, ExtractorConfig, JobExtractor};
pub use model::{JobRecord, JobStatus, SkillCategory, SkillEntry, TechnicalSkills};
pub use normalize::{normalize, NormalizeContext};
pub use pipeline::{ExtractionOutcome, ExtractionPipeline, PipelineError, PipelineFailure};
pub use protocol::{ApiRequest, ApiResponse, Dispatcher, ExtractRequest, ExtractResponse, Response};
pub use storage::ArtifactStore;
