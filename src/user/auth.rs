//! Password hashing and stored credentials

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

mod argon2_hasher {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash(plain: &[u8], b64_salt: &str) -> Result<String> {
        let salt = SaltString::from_b64(b64_salt).map_err(|err| anyhow!("{}", err))?;
        let hash = Argon2::default()
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash)
    }

    /// Fails only when `target_hash` is not a valid PHC string.
    pub fn verify(plain: &[u8], target_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(target_hash).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default().verify_password(plain, &parsed).is_ok())
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum PasswordHasher {
    Argon2,
}

impl FromStr for PasswordHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(PasswordHasher::Argon2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHasher::Argon2 => write!(f, "argon2"),
        }
    }
}

impl PasswordHasher {
    pub fn generate_b64_salt(&self) -> String {
        match self {
            PasswordHasher::Argon2 => argon2_hasher::generate_b64_salt(),
        }
    }

    pub fn hash(&self, plain: &str, b64_salt: &str) -> Result<String> {
        match self {
            PasswordHasher::Argon2 => argon2_hasher::hash(plain.as_bytes(), b64_salt),
        }
    }

    pub fn verify(&self, plain: &str, target_hash: &str) -> Result<bool> {
        match self {
            PasswordHasher::Argon2 => argon2_hasher::verify(plain.as_bytes(), target_hash),
        }
    }
}

/// A salted digest together with the algorithm that produced it.
#[derive(Clone, Debug)]
pub struct HashedPassword {
    pub salt: String,
    pub hash: String,
    pub hasher: PasswordHasher,
}

impl HashedPassword {
    pub fn new(plain: &str) -> Result<Self> {
        let hasher = PasswordHasher::Argon2;
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(plain, &salt)?;
        Ok(Self { salt, hash, hasher })
    }

    pub fn verify(&self, plain: &str) -> Result<bool> {
        self.hasher.verify(plain, &self.hash)
    }
}

#[derive(Clone, Debug)]
pub struct UsernamePasswordCredentials {
    pub user_id: String,
    pub password: HashedPassword,

    pub created: SystemTime,
    pub last_tried: Option<SystemTime>,
    pub last_used: Option<SystemTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2_hash() {
        let salt = PasswordHasher::Argon2.generate_b64_salt();

        let hash1 = PasswordHasher::Argon2.hash("123mypw", &salt).unwrap();
        let hash2 = PasswordHasher::Argon2.hash("123mypw", &salt).unwrap();
        assert_eq!(hash1, hash2);

        assert!(PasswordHasher::Argon2.verify("123mypw", &hash1).unwrap());
        assert!(!PasswordHasher::Argon2.verify("not the pw", &hash1).unwrap());
    }

    #[test]
    fn every_hash_gets_its_own_salt() {
        let first = HashedPassword::new("password123").unwrap();
        let second = HashedPassword::new("password123").unwrap();

        assert_ne!(first.salt, second.salt);
        assert_ne!(first.hash, second.hash);
        assert!(first.verify("password123").unwrap());
        assert!(second.verify("password123").unwrap());
        assert!(!first.verify("password124").unwrap());
    }

    #[test]
    fn malformed_digest_is_an_error() {
        let broken = HashedPassword {
            salt: "whatever".to_string(),
            hash: "not-a-phc-string".to_string(),
            hasher: PasswordHasher::Argon2,
        };
        assert!(broken.verify("password123").is_err());
    }

    #[test]
    fn hasher_name_round_trips() {
        let name = PasswordHasher::Argon2.to_string();
        assert_eq!(name, "argon2");
        assert_eq!(name.parse::<PasswordHasher>().unwrap(), PasswordHasher::Argon2);
        assert!("bcrypt".parse::<PasswordHasher>().is_err());
    }
}
