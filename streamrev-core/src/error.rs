/// Boxed error produced by a byte-stream source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A balanced candidate that still does not parse into an analysis object.
///
/// Recoverable: the controller treats it as "no update for this chunk".
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    #[error("candidate is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("candidate is not a JSON object")]
    NotAnObject,
}

/// Terminal failure of one analysis request.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("analysis stream failed after {chunks} chunk(s): {source}")]
    Transport {
        chunks: usize,
        #[source]
        source: BoxError,
    },
}
