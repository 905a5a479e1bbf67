use thiserror::Error;

// Every failure the store can raise. Non-fatal conditions (missing intermediate
// path, unresolved insert anchor, duplicate create) are logged, not returned.
#[derive(Debug, Error)]
pub enum StoreError {
    // No tokenizer matched at `offset`
    #[error("invalid tokens in path `{path}` at offset {offset}")]
    Tokenize { path: String, offset: usize },

    // Token stream does not form a path
    #[error("could not parse path `{path}`: {message}")]
    Parse { path: String, message: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}: source is not a record")]
    NotARecord(&'static str),

    #[error("{0}: source is not an array")]
    NotAnArray(&'static str),

    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("unsupported mutation: {0}")]
    UnsupportedMutation(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("patch would change the immutable id of document `{0}`")]
    ImmutableId(String),

    #[error("invalid diff-match-patch text: {0}")]
    InvalidPatchText(String),

    #[error("query error: {0}")]
    Query(String),

    // Fatal operator failure with enough context to find the offending patch
    #[error("{operator} `{path}` on document `{document_id}` failed: {source}")]
    Operator {
        operator: &'static str,
        path: String,
        document_id: String,
        #[source]
        source: Box<StoreError>,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn parse(path: &str, message: impl Into<String>) -> Self {
        StoreError::Parse {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// The innermost error, looking through operator context.
    pub fn root_cause(&self) -> &StoreError {
        match self {
            StoreError::Operator { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

// Type alias for results that use `StoreError` as the error type
pub type Result<T> = std::result::Result<T, StoreError>;
