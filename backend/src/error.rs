use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Unparseable item id, URL or request option. Aborts the single operation.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The upstream service has no record for the requested item.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport, quota or timeout failure talking to an external service.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Spreadsheet service answered with a non-success status.
    #[error("spreadsheet API error ({status}): {message}")]
    SheetsApi { status: u16, message: String },

    /// A listing violated the reverse-chronological ordering the cutoff scan relies on.
    #[error("listing out of chronological order: {0}")]
    ListingOutOfOrder(String),

    /// Every listing of a channel came back without a single item link.
    #[error("no links found on any listing of {0}")]
    NothingHarvested(String),

    #[error("link log error: {0}")]
    LinkLog(#[from] std::io::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SyncError::Upstream(format!("request timed out: {e}"))
        } else {
            SyncError::Upstream(e.to_string())
        }
    }
}

impl SyncError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}
