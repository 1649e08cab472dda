use std::borrow::Cow;

use validator::{Validate, ValidationError};

pub fn validate<T: Validate>(val: &T) -> Result<(), validator::ValidationErrors> {
    val.validate()
}

/// A user name must have visible content and no NUL characters.
///
/// Postgres `TEXT` cannot store `\0`, so it is rejected here rather than at insert.
pub fn validate_name(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank")
            .with_message(Cow::Borrowed("name must not be empty")));
    }
    if value.contains('\0') {
        return Err(ValidationError::new("nul")
            .with_message(Cow::Borrowed("name must not contain NUL characters")));
    }
    Ok(())
}

/// Requires at least one dot in the domain part, with no empty labels.
///
/// The `email` validator alone accepts single-label hosts such as `a@localhost`.
pub fn validate_email_domain(value: &str) -> Result<(), ValidationError> {
    let domain = value.rsplit_once('@').map(|(_, domain)| domain).unwrap_or("");
    let has_dotted_domain = domain.contains('.') && domain.split('.').all(|label| !label.is_empty());
    if !has_dotted_domain {
        return Err(ValidationError::new("email_domain")
            .with_message(Cow::Borrowed("must be a valid email address")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   \t").is_err());
        assert!(validate_name(" Ada ").is_ok());
    }

    #[test]
    fn nul_characters_are_rejected() {
        let err = validate_name("A\u{0}da").unwrap_err();
        assert_eq!(err.code, "nul");
        assert!(validate_name("\0").is_err());
    }

    #[test]
    fn email_domain_needs_a_dot() {
        assert!(validate_email_domain("ada@x.com").is_ok());
        assert!(validate_email_domain("ada@mail.example.org").is_ok());
        assert!(validate_email_domain("ada@localhost").is_err());
        assert!(validate_email_domain("ada@x.").is_err());
        assert!(validate_email_domain("ada@.com").is_err());
        assert!(validate_email_domain("ada").is_err());
    }
}
