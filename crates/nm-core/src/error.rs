//! Error types for the nm-core crate.
//!
//! - [`MockError`] - Every failure the resolution engine reports
//! - [`ConfigError`] - Loading a [`MockConfig`](crate::MockConfig) failed
//! - [`TemplateError`] - The test harness could not parse a template

use camino::Utf8PathBuf;

use crate::types::Kind;

/// Errors raised while synthesizing or resolving mocks.
///
/// All of them surface synchronously while a test is being set up.
///
/// # Examples
///
/// ```
/// use nm_core::MockError;
///
/// let error = MockError::MissingMock { class: "HeaderComponent".to_owned() };
/// assert_eq!(error.to_string(), "There is no mock for HeaderComponent");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// The metadata oracle cannot describe a class as the requested kind.
    #[error("cannot resolve {expected} metadata of {class}")]
    UnresolvableMetadata {
        /// Name of the class.
        class: String,
        /// The kind being mocked.
        expected: Kind,
    },

    /// No mock exists for the class, or it is of another kind.
    #[error("There is no mock for {class}")]
    MissingMock {
        /// Name of the original class.
        class: String,
    },

    /// The configuration layer asked for something contradictory.
    #[error("invalid override for {class}: {reason}")]
    InvalidOverride {
        /// Name of the class or token.
        class: String,
        /// What is wrong with the override.
        reason: String,
    },

    /// Declared classes were never reached by a walk.
    #[error("declarations not reached by any module: {}", .classes.join(", "))]
    UnreachableDeclarations {
        /// Names of the unreached classes.
        classes: Vec<String>,
    },

    /// Loading the configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Parsing a template failed.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl MockError {
    /// Returns `true` for [`MockError::MissingMock`].
    #[must_use]
    pub const fn is_missing_mock(&self) -> bool {
        matches!(self, Self::MissingMock { .. })
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("missing configuration file: {0}")]
    MissingFile(Utf8PathBuf),

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors produced by the template parser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A closing tag does not match the open element.
    #[error("unexpected closing tag </{found}> at offset {offset}, expected </{expected}>")]
    MismatchedClose {
        /// The element that is open.
        expected: String,
        /// The closing tag found.
        found: String,
        /// Byte offset of the closing tag.
        offset: usize,
    },

    /// An element was never closed.
    #[error("unclosed element <{0}>")]
    Unclosed(String),

    /// The input ended inside a tag or attribute.
    #[error("unexpected end of template at offset {0}")]
    UnexpectedEnd(usize),

    /// A tag name or attribute is malformed.
    #[error("malformed markup at offset {offset}: {reason}")]
    Malformed {
        /// Byte offset of the problem.
        offset: usize,
        /// Explanation.
        reason: String,
    },

    /// Components nest deeper than the renderer allows, usually because a
    /// component's template contains its own selector.
    #[error("component <{tag}> nested deeper than {limit} levels")]
    TooDeep {
        /// The element that would have opened one level too many.
        tag: String,
        /// The nesting limit.
        limit: usize,
    },
}

/// Result alias used throughout the workspace.
pub type Result<T, E = MockError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mock_display() {
        let error = MockError::MissingMock {
            class: "TargetModule".to_owned(),
        };
        assert_eq!(error.to_string(), "There is no mock for TargetModule");
        assert!(error.is_missing_mock());
    }

    #[test]
    fn test_unresolvable_metadata_display() {
        let error = MockError::UnresolvableMetadata {
            class: "Plain".to_owned(),
            expected: Kind::Component,
        };
        assert_eq!(error.to_string(), "cannot resolve component metadata of Plain");
        assert!(!error.is_missing_mock());
    }

    #[test]
    fn test_unreachable_lists_all() {
        let error = MockError::UnreachableDeclarations {
            classes: vec!["A".to_owned(), "B".to_owned()],
        };
        assert!(error.to_string().ends_with("A, B"));
    }

    #[test]
    fn test_template_error_converts() {
        let error: MockError = TemplateError::Unclosed("div".to_owned()).into();
        assert_eq!(error.to_string(), "unclosed element <div>");
    }

    #[test]
    fn test_config_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ConfigError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }
}
