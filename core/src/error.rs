use thiserror::Error;

/// Malformed input at the normalizer boundary. Missing data is not an error;
/// see [`crate::normalize::Insufficient`].
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid JSON at `{path}`: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unparseable DateTime `{0}`")]
    Timestamp(String),
}

impl From<serde_path_to_error::Error<serde_json::Error>> for NormalizeError {
    fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = e.path().to_string();
        NormalizeError::Json { path, source: e.into_inner() }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("profile io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("profile JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid athlete parameters: {0}")]
    InvalidParameters(String),
}

#[derive(Debug, Error)]
pub enum StravaError {
    #[error("Strava session expired, authenticate again")]
    SessionExpired,
    #[error("Strava rejected the access token (401)")]
    Unauthorized,
    #[error("Strava responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Strava transport error: {0}")]
    Transport(String),
    #[error("could not decode Strava response: {0}")]
    Decode(#[from] std::io::Error),
    #[error("token exchange failed: no access_token in response")]
    MissingToken,
}

impl From<ureq::Error> for StravaError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(401, _) => StravaError::Unauthorized,
            ureq::Error::Status(status, resp) => StravaError::Status {
                status,
                body: resp.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(t) => StravaError::Transport(t.to_string()),
        }
    }
}
