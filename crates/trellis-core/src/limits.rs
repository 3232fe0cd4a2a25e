//! Input validation limits for write paths and traversal requests

/// Maximum length for node and edge type names (128 chars)
pub const MAX_TYPE_LEN: usize = 128;

/// Maximum length for node labels (4KB)
pub const MAX_LABEL_LEN: usize = 4 * 1024;

/// Maximum traversal depth (50)
pub const MAX_TRAVERSAL_DEPTH: u32 = 50;

/// Maximum items in a single batch call (10000)
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyType,
    TypeTooLong { len: usize, max: usize },
    LabelTooLong { len: usize, max: usize },
    ConfidenceOutOfRange(f64),
    TraversalDepthTooLarge { depth: u32, max: u32 },
    BatchTooLarge { count: usize, max: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyType => write!(f, "Type cannot be empty"),
            Self::TypeTooLong { len, max } => {
                write!(f, "Type too long: {} chars (max {})", len, max)
            }
            Self::LabelTooLong { len, max } => {
                write!(f, "Label too long: {} chars (max {})", len, max)
            }
            Self::ConfidenceOutOfRange(value) => {
                write!(f, "Confidence must be within [0.0, 1.0], got {}", value)
            }
            Self::TraversalDepthTooLarge { depth, max } => {
                write!(f, "Traversal depth too large: {} (max {})", depth, max)
            }
            Self::BatchTooLarge { count, max } => {
                write!(f, "Too many items in batch: {} (max {})", count, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a node or edge type name
pub fn validate_type(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyType);
    }
    if name.len() > MAX_TYPE_LEN {
        return Err(ValidationError::TypeTooLong {
            len: name.len(),
            max: MAX_TYPE_LEN,
        });
    }
    Ok(())
}

/// Validate a node label
pub fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.len() > MAX_LABEL_LEN {
        return Err(ValidationError::LabelTooLong {
            len: label.len(),
            max: MAX_LABEL_LEN,
        });
    }
    Ok(())
}

/// Validate a confidence score; NaN and infinities are rejected too
pub fn validate_confidence(confidence: f64) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(ValidationError::ConfidenceOutOfRange(confidence));
    }
    Ok(())
}

/// Validate traversal depth against a configured ceiling
pub fn validate_traversal_depth(depth: u32, max: u32) -> Result<(), ValidationError> {
    if depth > max {
        return Err(ValidationError::TraversalDepthTooLarge { depth, max });
    }
    Ok(())
}

/// Validate batch item count against a configured ceiling
pub fn validate_batch_size(count: usize, max: usize) -> Result<(), ValidationError> {
    if count > max {
        return Err(ValidationError::BatchTooLarge { count, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_type() {
        assert!(validate_type("person").is_ok());
        assert_eq!(validate_type("  "), Err(ValidationError::EmptyType));
        assert!(validate_type(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_confidence() {
        assert!(validate_confidence(0.0).is_ok());
        assert!(validate_confidence(1.0).is_ok());
        assert!(validate_confidence(1.01).is_err());
        assert!(validate_confidence(-0.1).is_err());
        assert!(validate_confidence(f64::NAN).is_err());
        assert!(validate_confidence(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_limits() {
        assert!(validate_traversal_depth(50, MAX_TRAVERSAL_DEPTH).is_ok());
        assert!(validate_traversal_depth(51, MAX_TRAVERSAL_DEPTH).is_err());
        assert!(validate_batch_size(3, 2).is_err());
        assert!(validate_label(&"x".repeat(5000)).is_err());
    }
}
