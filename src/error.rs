#[derive(Debug, thiserror::Error)]
pub enum CrawlerError {
    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid selector `{selector}` for `{handle}`: {reason}")]
    InvalidSelector {
        handle: String,
        selector: String,
        reason: String,
    },

    #[error("Browser error")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("Unable to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("No element matches `{selector}` for `{handle}`")]
    MissingElement { handle: String, selector: String },

    #[error("No handler for output action `{0}`")]
    NoHandler(String),

    #[error("Output action `{action}` requires `{field}`")]
    MissingOutputField {
        action: &'static str,
        field: &'static str,
    },

    #[error("HTTP error")]
    Http(#[from] reqwest::Error),

    #[error("CSV error")]
    Csv(#[from] csv::Error),
}
