pub type MaplapseResult<T> = Result<T, MaplapseError>;

#[derive(thiserror::Error, Debug)]
pub enum MaplapseError {
    /// Date label text from the page did not resolve to a calendar date.
    /// A page rendering unexpected text is unsafe to keep scraping.
    #[error("date parse error: {0}")]
    DateParse(String),

    /// The requested capture geometry cannot be satisfied on this screen.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A page element never became visible/clickable within the session bound.
    #[error("wait timeout: {0}")]
    WaitTimeout(String),

    /// Annotation table or annotation kind is misconfigured.
    #[error("annotation error: {0}")]
    Annotation(String),

    /// The external encoder exited non-zero or could not be started.
    #[error("encode error: {0}")]
    Encode(String),

    /// Browser automation backend failure.
    #[error("driver error: {0}")]
    Driver(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MaplapseError {
    pub fn date_parse(msg: impl Into<String>) -> Self {
        Self::DateParse(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn wait_timeout(msg: impl Into<String>) -> Self {
        Self::WaitTimeout(msg.into())
    }

    pub fn annotation(msg: impl Into<String>) -> Self {
        Self::Annotation(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            MaplapseError::date_parse("x")
                .to_string()
                .contains("date parse error:")
        );
        assert!(
            MaplapseError::geometry("x")
                .to_string()
                .contains("geometry error:")
        );
        assert!(
            MaplapseError::wait_timeout("x")
                .to_string()
                .contains("wait timeout:")
        );
        assert!(
            MaplapseError::annotation("x")
                .to_string()
                .contains("annotation error:")
        );
        assert!(
            MaplapseError::encode("x")
                .to_string()
                .contains("encode error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = MaplapseError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
