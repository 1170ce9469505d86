use serde::{Deserialize, Serialize};

/// Outcome of validating settings. Errors are authoritative: the status is
/// valid exactly when there are none. Warnings never block anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStatus {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationStatus {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            warnings: Vec::new(),
        }
    }

    /// A status that carries `message` as an error only when `condition` holds.
    pub fn error_if(condition: bool, message: impl Into<String>) -> Self {
        if condition {
            Self::error(message)
        } else {
            Self::ok()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Records `message` when `condition` holds.
    pub fn forbid(&mut self, condition: bool, message: impl Into<String>) {
        if condition {
            self.add_error(message);
        }
    }

    /// Records `message` unless `condition` holds.
    pub fn mandate(&mut self, condition: bool, message: impl Into<String>) {
        self.forbid(!condition, message);
    }

    pub fn merge(&mut self, other: ValidationStatus) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Merges `other`, prefixing each message with `label: `.
    pub fn merge_labeled(&mut self, label: &str, other: ValidationStatus) {
        self.errors
            .extend(other.errors.into_iter().map(|e| format!("{label}: {e}")));
        self.warnings
            .extend(other.warnings.into_iter().map(|w| format!("{label}: {w}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_tracks_errors_only() {
        let mut status = ValidationStatus::ok();
        status.add_warning("just so you know");
        assert!(status.is_valid());
        status.forbid(true, "bad");
        assert!(!status.is_valid());
    }

    #[test]
    fn mandate_and_error_if() {
        let mut status = ValidationStatus::error_if(false, "never");
        status.mandate(true, "fine");
        assert!(status.is_valid());
        status.mandate(false, "must hold");
        assert_eq!(status.errors, vec!["must hold".to_string()]);
    }

    #[test]
    fn merge_labeled_prefixes_messages() {
        let mut status = ValidationStatus::ok();
        let mut inner = ValidationStatus::error("must be positive");
        inner.add_warning("large");
        status.merge_labeled("Modulus", inner);
        assert_eq!(status.errors, vec!["Modulus: must be positive".to_string()]);
        assert_eq!(status.warnings, vec!["Modulus: large".to_string()]);
    }
}
