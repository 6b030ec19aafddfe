//! The `NameValidator` capability consumed by every store.
//!
//! Request-parameter validation proper (character-class policy, length
//! limits) is an external concern — the core only requires *some*
//! implementation of this trait. [`DefaultNameValidator`] is a reference
//! implementation good enough to exercise the whole repository end to end.

/// The reserved scope name that short-circuits per-scope filtering and
/// existence checks in the access composer.
pub const DEFAULT_SCOPE_NAME: &str = "default";

/// Outcome of validating and normalizing a raw name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub normalized: String,
}

impl ValidationOutcome {
    fn valid(normalized: String) -> Self {
        Self {
            is_valid: true,
            normalized,
        }
    }

    fn invalid() -> Self {
        Self {
            is_valid: false,
            normalized: String::new(),
        }
    }
}

/// One instance of this capability exists per name kind (resource, scope,
/// role), though a single implementation may serve all three.
pub trait NameValidator: Send + Sync {
    /// Validates `raw` and returns its normalized storage form.
    fn validate(&self, raw: &str) -> ValidationOutcome;

    /// Identifies the reserved default scope name in its normalized form.
    fn is_default(&self, normalized: &str) -> bool {
        normalized == DEFAULT_SCOPE_NAME
    }
}

/// Normalizes by trimming and ASCII-lowercasing, and accepts the charset
/// `[a-z0-9._:/-]` (permissive enough for IAM-ARN-shaped resource names
/// like `arn:aws:iam::1:user/u` and `api://svc`).
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNameValidator;

impl NameValidator for DefaultNameValidator {
    fn validate(&self, raw: &str) -> ValidationOutcome {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > 512 {
            return ValidationOutcome::invalid();
        }
        let normalized = trimmed.to_ascii_lowercase();
        let is_valid = normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '/' | '-'));
        if is_valid {
            ValidationOutcome::valid(normalized)
        } else {
            ValidationOutcome::invalid()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let v = DefaultNameValidator;
        let out = v.validate("  Api://Svc  ");
        assert!(out.is_valid);
        assert_eq!(out.normalized, "api://svc");
    }

    #[test]
    fn rejects_empty_and_illegal_chars() {
        let v = DefaultNameValidator;
        assert!(!v.validate("").is_valid);
        assert!(!v.validate("   ").is_valid);
        assert!(!v.validate("has space").is_valid);
        assert!(!v.validate("semi;colon").is_valid);
    }

    #[test]
    fn recognizes_default_scope_normalized() {
        let v = DefaultNameValidator;
        assert!(v.is_default("default"));
        assert!(!v.is_default("prod"));
    }
}
