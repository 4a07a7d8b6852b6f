use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use sweeper_common::diagnostic::{Diagnosable, Error};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryNameError {
    #[error("Repository name is empty")]
    Empty,
}

impl Diagnosable for RepositoryNameError {
    fn code(&self) -> String {
        "REPOSITORY_NAME_EMPTY".to_string()
    }
    fn suggestion(&self) -> Option<String> {
        Some("The registry returned a repository without a name".to_string())
    }
}

/// Unique name of a repository within the registry, e.g. `team/service`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryName(String);

impl RepositoryName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::new(RepositoryNameError::Empty));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RepositoryName> for String {
    fn from(name: RepositoryName) -> Self {
        name.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
