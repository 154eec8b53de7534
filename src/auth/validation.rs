//! Input validation for Solera accounts.
//!
//! Password strength checks return every violated rule, not just the
//! first, so a UI can render a complete checklist.

use thiserror::Error;

use crate::auth::hasher::MAX_PASSWORD_LENGTH;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Substrings that disqualify a password outright.
const WEAK_SUBSTRINGS: &[&str] = &[
    "password",
    "contraseña",
    "123456",
    "qwerty",
    "admin",
    "letmein",
    "abc123",
    "111111",
];

/// Validation errors for account fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is too short.
    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    UsernameTooShort,

    /// Username is too long.
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    /// Username contains invalid characters.
    #[error("username can only contain alphanumeric characters, dots and underscores")]
    UsernameInvalidChars,
}

/// A single violated password-strength rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrengthIssue {
    /// Password is shorter than the policy minimum.
    #[error("password must be at least {0} characters")]
    TooShort(usize),

    /// Password is longer than the policy maximum.
    #[error("password must be at most {0} characters")]
    TooLong(usize),

    /// No lowercase letter.
    #[error("password must contain a lowercase letter")]
    MissingLowercase,

    /// No uppercase letter.
    #[error("password must contain an uppercase letter")]
    MissingUppercase,

    /// No digit.
    #[error("password must contain a digit")]
    MissingDigit,

    /// No symbol.
    #[error("password must contain a symbol")]
    MissingSymbol,

    /// Contains a well-known weak substring.
    #[error("password contains the common sequence \"{0}\"")]
    CommonSequence(String),
}

/// Password strength policy.
#[derive(Debug, Clone, Copy)]
pub struct StrengthPolicy {
    /// Minimum password length.
    pub min_length: usize,
    /// Maximum password length.
    pub max_length: usize,
}

impl Default for StrengthPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: MAX_PASSWORD_LENGTH,
        }
    }
}

impl StrengthPolicy {
    /// Create a policy with a custom minimum length.
    pub fn with_min_length(min_length: usize) -> Self {
        Self {
            min_length,
            ..Self::default()
        }
    }
}

/// Validate a username.
///
/// Requirements: 3-32 characters, alphanumeric plus dot and underscore.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooShort);
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(ValidationError::UsernameInvalidChars);
    }
    Ok(())
}

/// Validate password strength against a policy.
///
/// Collects every violated rule. `Ok(())` means the password satisfies
/// the full policy.
pub fn validate_strength(password: &str, policy: &StrengthPolicy) -> Result<(), Vec<StrengthIssue>> {
    let mut issues = Vec::new();

    let length = password.chars().count();
    if length < policy.min_length {
        issues.push(StrengthIssue::TooShort(policy.min_length));
    }
    if length > policy.max_length {
        issues.push(StrengthIssue::TooLong(policy.max_length));
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        issues.push(StrengthIssue::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        issues.push(StrengthIssue::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        issues.push(StrengthIssue::MissingDigit);
    }
    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        issues.push(StrengthIssue::MissingSymbol);
    }

    let lowered = password.to_lowercase();
    for weak in WEAK_SUBSTRINGS {
        if lowered.contains(weak) {
            issues.push(StrengthIssue::CommonSequence((*weak).to_string()));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("jperez").is_ok());
        assert!(validate_username("j.perez_2").is_ok());
        assert!(validate_username("ana").is_ok());
    }

    #[test]
    fn test_validate_username_too_short() {
        assert_eq!(
            validate_username("ab"),
            Err(ValidationError::UsernameTooShort)
        );
        assert_eq!(validate_username(""), Err(ValidationError::UsernameTooShort));
    }

    #[test]
    fn test_validate_username_too_long() {
        let long = "a".repeat(33);
        assert_eq!(
            validate_username(&long),
            Err(ValidationError::UsernameTooLong)
        );
        assert!(validate_username(&"a".repeat(32)).is_ok());
    }

    #[test]
    fn test_validate_username_invalid_chars() {
        assert_eq!(
            validate_username("juan perez"),
            Err(ValidationError::UsernameInvalidChars)
        );
        assert_eq!(
            validate_username("juan@perez"),
            Err(ValidationError::UsernameInvalidChars)
        );
        assert_eq!(
            validate_username("josé"),
            Err(ValidationError::UsernameInvalidChars)
        );
    }

    #[test]
    fn test_validate_strength_accepts_strong() {
        let policy = StrengthPolicy::default();
        assert!(validate_strength("Str0ng!Pass", &policy).is_ok());
        assert!(validate_strength("xK9#mPq2vL", &policy).is_ok());
    }

    #[test]
    fn test_validate_strength_collects_all_issues() {
        let policy = StrengthPolicy::default();
        let issues = validate_strength("password", &policy).unwrap_err();

        assert!(issues.contains(&StrengthIssue::MissingUppercase));
        assert!(issues.contains(&StrengthIssue::MissingDigit));
        assert!(issues.contains(&StrengthIssue::MissingSymbol));
        assert!(issues.contains(&StrengthIssue::CommonSequence("password".to_string())));
        // Every violated rule is reported, not just the first
        assert!(issues.len() >= 4);
    }

    #[test]
    fn test_validate_strength_too_short() {
        let policy = StrengthPolicy::default();
        let issues = validate_strength("aB1!", &policy).unwrap_err();
        assert_eq!(issues, vec![StrengthIssue::TooShort(8)]);
    }

    #[test]
    fn test_validate_strength_too_long() {
        let policy = StrengthPolicy::default();
        let long = format!("aB1!{}", "x".repeat(130));
        let issues = validate_strength(&long, &policy).unwrap_err();
        assert!(issues.contains(&StrengthIssue::TooLong(MAX_PASSWORD_LENGTH)));
    }

    #[test]
    fn test_validate_strength_weak_substring_case_insensitive() {
        let policy = StrengthPolicy::default();
        let issues = validate_strength("QwErTy99!x", &policy).unwrap_err();
        assert_eq!(
            issues,
            vec![StrengthIssue::CommonSequence("qwerty".to_string())]
        );
    }

    #[test]
    fn test_validate_strength_custom_min_length() {
        let policy = StrengthPolicy::with_min_length(12);
        let issues = validate_strength("Str0ng!Pass", &policy).unwrap_err();
        assert_eq!(issues, vec![StrengthIssue::TooShort(12)]);
    }

    #[test]
    fn test_issue_display() {
        assert_eq!(
            StrengthIssue::TooShort(8).to_string(),
            "password must be at least 8 characters"
        );
        assert!(StrengthIssue::MissingUppercase
            .to_string()
            .contains("uppercase"));
        assert!(StrengthIssue::CommonSequence("qwerty".to_string())
            .to_string()
            .contains("qwerty"));
    }
}
