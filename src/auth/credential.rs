use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

const SCHEME: &str = "sha256";

/// Stored credential blob: `sha256$<salt>$<hex digest>`.
///
/// Callers only derive and verify; the layout is private so the scheme can be
/// replaced without touching the user schema.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn derive(secret: &str) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = digest(&salt, secret);
        Credential(format!("{}${}${}", SCHEME, salt, digest))
    }

    pub fn verify(&self, candidate: &str) -> bool {
        let mut parts = self.0.splitn(3, '$');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(SCHEME), Some(salt), Some(expected)) => digest(salt, candidate) == expected,
            _ => {
                tracing::warn!("Stored credential has an unrecognised format");
                false
            }
        }
    }
}

fn digest(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}
