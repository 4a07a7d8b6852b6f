use reqwest::StatusCode;
use sweeper_common::diagnostic::Diagnosable;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to authenticate with registry: {0}")]
    AuthenticationFailed(String),
    #[error("Malformed WWW-Authenticate challenge: {0}")]
    InvalidChallenge(String),
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: StatusCode, url: String },
    #[error("Registry returned no digest for {0}")]
    MissingDigest(String),
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),
    #[error("Invalid registry URL: {0}")]
    InvalidUrl(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Diagnosable for RegistryError {
    fn code(&self) -> String {
        match self {
            Self::AuthenticationFailed(_) => "REG_AUTH_FAILED".to_string(),
            Self::InvalidChallenge(_) => "REG_AUTH_CHALLENGE_INVALID".to_string(),
            Self::UnexpectedStatus { .. } => "REG_UNEXPECTED_STATUS".to_string(),
            Self::MissingDigest(_) => "REG_DIGEST_MISSING".to_string(),
            Self::InvalidDigest(_) => "REG_DIGEST_INVALID".to_string(),
            Self::InvalidUrl(_) => "REG_URL_INVALID".to_string(),
            Self::Network(_) => "REG_NETWORK_ERROR".to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Self::AuthenticationFailed(_) => Some("Check the registry credentials and that they may delete manifests.".to_string()),
            Self::UnexpectedStatus { status, .. } if *status == StatusCode::METHOD_NOT_ALLOWED => {
                Some("The registry has deletes disabled (REGISTRY_STORAGE_DELETE_ENABLED).".to_string())
            }
            Self::UnexpectedStatus { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => {
                Some("The registry is throttling; lower --concurrency.".to_string())
            }
            Self::Network(_) => Some("Check network connectivity to the registry.".to_string()),
            Self::InvalidUrl(_) => Some("Registry URLs look like https://registry.example.com".to_string()),
            _ => None,
        }
    }
}
