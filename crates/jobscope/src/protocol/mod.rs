//! Native messaging protocol: inbound shapes, replies and routing.

pub mod dispatcher;
pub mod messages;

use thiserror::Error;

pub use dispatcher::Dispatcher;
pub use messages::{
    encode_response, parse_inbound, ApiRequest, ApiResponse, ExtractRequest, ExtractResponse,
    ExtractSettings, Inbound, Response,
};

use crate::db::DatabaseError;

/// A request that was decoded but could not be served.
///
/// Always reported back to the extension as an error reply; never fatal.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("unrecognized message: {0}")]
    UnrecognizedMessage(String),

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("missing or invalid {0}")]
    InvalidField(&'static str),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("database not initialized")]
    DatabaseUnavailable,

    #[error("{0}")]
    Database(#[from] DatabaseError),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}
