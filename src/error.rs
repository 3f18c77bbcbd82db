use thiserror::Error;

/// A fatal job outcome, reported to the host as a title and details pair
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{title}: {details}")]
pub struct JobFailure {
    pub title: String,
    pub details: String,
}

impl JobFailure {
    pub fn new(title: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            details: details.into(),
        }
    }

    pub fn into_pair(self) -> (String, String) {
        (self.title, self.details)
    }
}

pub type JobResult<T = ()> = Result<T, JobFailure>;
