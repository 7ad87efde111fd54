/// Convenience result type used across scrollfx.
pub type ScrollFxResult<T> = Result<T, ScrollFxError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Expected absence (unknown discriminant, missing element) is not an error at
/// construction time; it is logged and produces an inert instance.
#[derive(thiserror::Error, Debug)]
pub enum ScrollFxError {
    /// Malformed engine or page configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A selector or node handle resolved to nothing.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// An instance was driven outside of its bound lifetime.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScrollFxError {
    /// Build a [`ScrollFxError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`ScrollFxError::ElementNotFound`] value.
    pub fn element_not_found(msg: impl Into<String>) -> Self {
        Self::ElementNotFound(msg.into())
    }

    /// Build a [`ScrollFxError::Lifecycle`] value.
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Build a [`ScrollFxError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for ScrollFxError {
    fn from(err: serde_json::Error) -> Self {
        Self::serde(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ScrollFxError::config("x")
                .to_string()
                .contains("config error:")
        );
        assert!(
            ScrollFxError::element_not_found("#hero")
                .to_string()
                .contains("element not found: #hero")
        );
        assert!(
            ScrollFxError::lifecycle("x")
                .to_string()
                .contains("lifecycle error:")
        );
        assert!(
            ScrollFxError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ScrollFxError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn json_errors_map_to_serde() {
        let err: ScrollFxError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ScrollFxError::Serde(_)));
    }
}
