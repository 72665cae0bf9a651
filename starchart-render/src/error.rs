use starchart_catalog::CatalogueError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Exclusion registry full: limit is {limit} regions")]
    ExclusionCapacity { limit: usize },

    #[error("Label buffer full: limit is {limit} requests")]
    LabelCapacity { limit: usize },

    #[error("Labels already placed for this chart; reset the engine first")]
    LabelsAlreadyPlaced,

    #[error("Invalid render settings: {message}")]
    InvalidSettings { message: String },

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
}

impl RenderError {
    pub fn invalid_settings(message: impl Into<String>) -> Self {
        Self::InvalidSettings {
            message: message.into(),
        }
    }
}
