//! Credential gate. Checks only that the form is filled in; no account is
//! looked up and nothing is hashed. Any non-empty input yields a session.

use crate::domain::Session;
use crate::error::{Result, ValidationError};
use crate::session::SessionStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignIn {
    /// Username + password form. Fields are trimmed before checking.
    Username { username: String, password: String },
    /// Email + password form. The username becomes the part before `@`.
    Email { email: String, password: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignUp {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

fn require(field: &'static str, value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}

impl SignIn {
    pub fn validate(&self) -> std::result::Result<Session, ValidationError> {
        match self {
            SignIn::Username { username, password } => {
                let (username, password) = (username.trim(), password.trim());
                require("username", username)?;
                require("password", password)?;
                Ok(Session::with_password(username, password))
            }
            SignIn::Email { email, password } => {
                require("email", email)?;
                require("password", password)?;
                let username = email.split('@').next().unwrap_or_default();
                Ok(Session::with_email(username, email.as_str()))
            }
        }
    }

    /// Validate and store the resulting session.
    pub fn submit(&self, sessions: &dyn SessionStore) -> Result<Session> {
        let session = self.validate()?;
        sessions.set(&session)?;
        Ok(session)
    }
}

impl SignUp {
    pub fn validate(&self) -> std::result::Result<Session, ValidationError> {
        require("first name", &self.first_name)?;
        require("last name", &self.last_name)?;
        require("email", &self.email)?;
        require("password", &self.password)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(Session::with_email(
            format!("{} {}", self.first_name, self.last_name),
            self.email.as_str(),
        ))
    }

    pub fn submit(&self, sessions: &dyn SessionStore) -> Result<Session> {
        let session = self.validate()?;
        sessions.set(&session)?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HaloError;
    use crate::session::MemorySessionStore;

    fn signup() -> SignUp {
        SignUp {
            first_name: "Ana".into(),
            last_name: "Lima".into(),
            email: "ana@example.com".into(),
            password: "pw".into(),
            confirm_password: "pw".into(),
        }
    }

    #[test]
    fn username_signin_trims_and_stores() {
        let sessions = MemorySessionStore::new();
        let s = SignIn::Username {
            username: "  ana ".into(),
            password: " pw ".into(),
        }
        .submit(&sessions)
        .unwrap();
        assert_eq!(s, Session::with_password("ana", "pw"));
        assert_eq!(sessions.get().unwrap(), Some(s));
    }

    #[test]
    fn whitespace_only_username_is_empty() {
        let err = SignIn::Username {
            username: "   ".into(),
            password: "pw".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("username"));
    }

    #[test]
    fn email_signin_derives_username() {
        let s = SignIn::Email {
            email: "ana@example.com".into(),
            password: "x".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(s.username, "ana");
        assert_eq!(s.email(), Some("ana@example.com"));
    }

    #[test]
    fn any_credentials_are_accepted_repeatedly() {
        let sessions = MemorySessionStore::new();
        for (u, p) in [("a", "1"), ("b", "2")] {
            SignIn::Username {
                username: u.into(),
                password: p.into(),
            }
            .submit(&sessions)
            .unwrap();
        }
        assert_eq!(sessions.get().unwrap().unwrap().username, "b");
    }

    #[test]
    fn signup_builds_full_name_session() {
        let s = signup().validate().unwrap();
        assert_eq!(s.username, "Ana Lima");
        assert_eq!(s.email(), Some("ana@example.com"));
    }

    #[test]
    fn signup_reports_first_missing_field_in_form_order() {
        let mut form = signup();
        form.last_name.clear();
        form.password.clear();
        assert_eq!(
            form.validate().unwrap_err(),
            ValidationError::EmptyField("last name")
        );
    }

    #[test]
    fn signup_mismatch_writes_no_session() {
        let sessions = MemorySessionStore::new();
        let mut form = signup();
        form.confirm_password = "other".into();
        let err = form.submit(&sessions).unwrap_err();
        assert!(matches!(
            err,
            HaloError::Validation(ValidationError::PasswordMismatch)
        ));
        assert_eq!(sessions.get().unwrap(), None);
    }
}
