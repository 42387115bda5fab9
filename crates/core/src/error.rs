use thiserror::Error;

pub type BannerResult<T> = Result<T, BannerError>;

#[derive(Error, Debug)]
pub enum BannerError {
    #[error("Banner not found")]
    NotFound,

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl BannerError {
    /// True for the "no matching banner" outcome, as opposed to a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BannerError::NotFound)
    }
}
