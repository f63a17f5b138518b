// halo_core/src/domain.rs
use serde::Serialize;
use serde_json::Value;

/// A named blob as handed to and returned from the file store.
///
/// `name` is the primary key; saving under an existing name replaces the
/// previous bytes. `mime_type` is advisory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl StoredFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Listing row: record metadata without the blob bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRow {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub blake3: [u8; 32],
}

impl FileRow {
    /// First 12 hex digits of the content hash.
    pub fn short_digest(&self) -> String {
        hex::encode(&self.blake3[..6])
    }
}

/// The signed-in user. Presence alone gates the drive view; nothing here is verified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    pub username: String,
    #[serde(flatten)]
    pub credential: Credential,
}

/// Second half of the session pair. Stored flat next to `username`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Credential {
    Password { password: String },
    Email { email: String },
    /// A session value written by something else; kept so it still counts as signed in.
    Unspecified {},
}

impl Session {
    pub fn with_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            credential: Credential::Password {
                password: password.into(),
            },
        }
    }

    pub fn with_email(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            credential: Credential::Email {
                email: email.into(),
            },
        }
    }

    /// Read a stored session value the way the drive gate judges it.
    ///
    /// Falsy JSON (`null`, `false`, `0`, `""`) means nobody is signed in. Any
    /// other value is a session; fields of an unexpected type are ignored.
    pub fn from_stored(value: &Value) -> Option<Self> {
        let present = match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        };
        if !present {
            return None;
        }
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
        let credential = if let Some(password) = text("password") {
            Credential::Password { password }
        } else if let Some(email) = text("email") {
            Credential::Email { email }
        } else {
            Credential::Unspecified {}
        };
        Some(Self {
            username: text("username").unwrap_or_default(),
            credential,
        })
    }

    pub fn email(&self) -> Option<&str> {
        match &self.credential {
            Credential::Email { email } => Some(email),
            _ => None,
        }
    }

    /// First word of the username, used for the greeting.
    pub fn first_name(&self) -> &str {
        self.username.split(' ').next().unwrap_or_default()
    }

    /// Avatar letter.
    pub fn initial(&self) -> Option<char> {
        self.first_name()
            .chars()
            .next()
            .map(|c| c.to_uppercase().next().unwrap_or(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_session_serializes_flat() {
        let s = Session::with_password("ana", "hunter2");
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "username": "ana", "password": "hunter2" })
        );
    }

    #[test]
    fn email_session_reads_from_component_shape() {
        let s = Session::from_stored(&json!({"username": "Ana Lima", "email": "ana@example.com"}))
            .unwrap();
        assert_eq!(s.email(), Some("ana@example.com"));
        assert_eq!(s.first_name(), "Ana");
        assert_eq!(s.initial(), Some('A'));
    }

    #[test]
    fn stored_session_round_trips_through_json() {
        let s = Session::with_password("ana", "hunter2");
        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(Session::from_stored(&value), Some(s));
    }

    #[test]
    fn foreign_session_shape_is_still_a_session() {
        let s = Session::from_stored(&json!({"token": "abc"})).unwrap();
        assert_eq!(s.username, "");
        assert_eq!(s.credential, Credential::Unspecified {});
        assert_eq!(s.initial(), None);
    }

    #[test]
    fn odd_field_types_do_not_hide_the_session() {
        let s = Session::from_stored(&json!({"username": 42, "password": "pw"})).unwrap();
        assert_eq!(s.username, "");
        assert_eq!(s.credential, Credential::Password { password: "pw".into() });

        let s = Session::from_stored(&json!({"username": "ana", "email": ["x"]})).unwrap();
        assert_eq!(s.username, "ana");
        assert_eq!(s.credential, Credential::Unspecified {});
    }

    #[test]
    fn truthiness_decides_presence() {
        for falsy in [json!(null), json!(false), json!(0), json!("")] {
            assert_eq!(Session::from_stored(&falsy), None, "{falsy}");
        }
        for truthy in [json!("ana"), json!(true), json!(1), json!([]), json!({})] {
            assert!(Session::from_stored(&truthy).is_some(), "{truthy}");
        }
    }

    #[test]
    fn short_digest_is_hex_prefix() {
        let row = FileRow {
            name: "a".into(),
            mime_type: String::new(),
            size: 0,
            blake3: [0xab; 32],
        };
        assert_eq!(row.short_digest(), "abababababab");
    }

    #[test]
    fn stored_file_size_counts_bytes() {
        assert_eq!(StoredFile::new("a.txt", "text/plain", vec![72, 105]).size(), 2);
        assert_eq!(StoredFile::new("empty", "", Vec::new()).size(), 0);
    }
}
