use seed_proto::SeedDetailsRequest;
use thiserror::Error;

/// Parameters of the `/seeds/<seed>/<version>` route, kept as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParams {
    pub seed: String,
    pub version: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route '{0}' does not match /seeds/<seed>/<version>")]
    Unmatched(String),
    #[error("route '{0}' has an empty {1} segment")]
    EmptySegment(String, &'static str),
}

impl RouteParams {
    pub fn new(seed: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            version: version.into(),
        }
    }

    pub fn parse_path(path: &str) -> Result<Self, RouteError> {
        let trimmed = path.trim();
        let stripped = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let stripped = stripped.strip_suffix('/').unwrap_or(stripped);
        let segments: Vec<&str> = stripped.split('/').collect();
        match segments.as_slice() {
            ["seeds", seed, version] => {
                if seed.is_empty() {
                    return Err(RouteError::EmptySegment(path.to_string(), "seed"));
                }
                if version.is_empty() {
                    return Err(RouteError::EmptySegment(path.to_string(), "version"));
                }
                Ok(Self::new(*seed, *version))
            }
            _ => Err(RouteError::Unmatched(path.to_string())),
        }
    }

    pub fn path(&self) -> String {
        format!("/seeds/{}/{}", self.seed, self.version)
    }

    pub fn request(&self) -> SeedDetailsRequest {
        SeedDetailsRequest::new(self.seed.clone(), self.version.clone())
    }
}
