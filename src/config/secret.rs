//! Credential wrapper for configuration values
//!
//! The PostgreSQL connection string carries a password, so it is held in a
//! `secrecy::Secret` that redacts itself in `Debug` output and zeroes its
//! buffer on drop.
//!
//! ```rust
//! use fhirsync::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let dsn = secret_string("postgresql://sync:hunter2@db/fhir".to_string());
//! assert!(!format!("{dsn:?}").contains("hunter2"));
//! assert_eq!(dsn.expose_secret().as_str(), "postgresql://sync:hunter2@db/fhir");
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload that is wiped when dropped
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl SecretValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A string that is redacted in logs and zeroed on drop
pub type SecretString = Secret<SecretValue>;

/// Wraps a plain string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Connection string with the credentials part replaced, safe to log
///
/// Everything up to the last `@` is treated as scheme plus credentials.
pub fn redact_connection_string(connection_string: &SecretString) -> String {
    use secrecy::ExposeSecret;

    match connection_string.expose_secret().as_str().rsplit_once('@') {
        Some((_, host_part)) => format!("postgresql://***@{host_part}"),
        None => "postgresql://***".to_string(),
    }
}
