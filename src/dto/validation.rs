//! Validation of signup input.

use validator::Validate;

/// Signup fields validated before a player row is created. The 99-character
/// bounds are carried over from the original player schema.
#[derive(Debug, Validate)]
pub struct SignupInput {
    #[validate(length(min = 1, max = 99, message = "nickname must be 1-99 characters"))]
    pub nickname: String,
    #[validate(
        email(message = "email must be a valid address"),
        length(max = 99, message = "email must be at most 99 characters")
    )]
    pub email: String,
    #[validate(length(min = 1, max = 99, message = "password must be 1-99 characters"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(nickname: &str, email: &str, password: &str) -> SignupInput {
        SignupInput {
            nickname: nickname.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn well_formed_input_passes() {
        assert!(input("ada", "ada@example.com", "hunter2!").validate().is_ok());
    }

    #[test]
    fn empty_nickname_is_rejected() {
        assert!(input("", "ada@example.com", "hunter2!").validate().is_err());
    }

    #[test]
    fn oversized_fields_are_rejected() {
        let long = "x".repeat(120);
        assert!(
            input(&long, "ada@example.com", "hunter2!")
                .validate()
                .is_err()
        );
        assert!(input("ada", "ada@example.com", &long).validate().is_err());
    }

    #[test]
    fn malformed_email_is_rejected() {
        assert!(input("ada", "not-an-email", "hunter2!").validate().is_err());
    }
}
