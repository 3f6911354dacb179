//! Credential hashing and login.
//!
//! The hashing primitive is pluggable through [`CredentialHasher`]; the
//! shipped scheme is salted Argon2id. Stored hashes are PHC strings, so the
//! parameters used at registration travel with the hash.

use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::builder::UserBuilder;
use crate::error::{Result, TodoError};
use crate::model::User;
use crate::storage::Storage;

/// A credential scheme: derive a storable hash, check a password against one.
pub trait CredentialHasher {
    /// # Errors
    ///
    /// Returns `Credential` if hashing fails.
    fn hash(&self, password: &str) -> Result<String>;

    /// Returns `Ok(false)` on mismatch.
    ///
    /// # Errors
    ///
    /// Returns `Credential` if the stored hash is malformed.
    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool>;

    /// A hash no password is expected to match, produced with the same cost
    /// as real hashes. Login verifies against it when the name is unknown.
    ///
    /// # Errors
    ///
    /// Returns `Credential` if hashing fails.
    fn decoy_hash(&self) -> Result<String>;
}

/// Argon2id with a random 16-byte salt per hash.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    params: Params,
    decoy: OnceLock<String>,
}

impl Argon2Hasher {
    /// Hasher with explicit cost parameters (memory in KiB).
    ///
    /// # Errors
    ///
    /// Returns `Credential` if the parameters are out of range.
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = ParamsBuilder::new()
            .m_cost(m_cost)
            .t_cost(t_cost)
            .p_cost(p_cost)
            .build()
            .map_err(|e| TodoError::Credential(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self {
            params,
            decoy: OnceLock::new(),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| TodoError::Credential(format!("hash generation failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| TodoError::Credential(format!("malformed stored hash: {e}")))?;

        // Parameters come from the PHC string, not from `self`.
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(TodoError::Credential(format!("verification failed: {e}"))),
        }
    }

    fn decoy_hash(&self) -> Result<String> {
        if let Some(decoy) = self.decoy.get() {
            return Ok(decoy.clone());
        }
        let fresh = self.hash(SaltString::generate(&mut OsRng).as_str())?;
        Ok(self.decoy.get_or_init(|| fresh).clone())
    }
}

/// Check a name/password pair and hydrate the user.
///
/// Unknown names and wrong passwords both yield `Authentication`.
///
/// # Errors
///
/// Returns `Authentication` on mismatch, or a storage error.
pub fn authenticate(
    storage: &dyn Storage,
    hasher: &dyn CredentialHasher,
    name: &str,
    password: &str,
) -> Result<User> {
    let Some(stored_hash) = storage.get_credential_hash_by_name(name)? else {
        // An unknown name pays for one full verification, like a wrong password.
        hasher.verify(password, &hasher.decoy_hash()?)?;
        warn!(name, "Login rejected");
        return Err(TodoError::Authentication);
    };

    if !hasher.verify(password, &stored_hash)? {
        warn!(name, "Login rejected");
        return Err(TodoError::Authentication);
    }

    let user = UserBuilder::new(storage).build_by_name(name)?;
    debug!(user_id = user.db_id, "Authenticated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use std::cell::Cell;

    fn cheap_hasher() -> Argon2Hasher {
        Argon2Hasher::with_cost(8, 1, 1).unwrap()
    }

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let hasher = cheap_hasher();
        let first = hasher.hash("secret").unwrap();
        let second = hasher.hash("secret").unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(hasher.verify("secret", &first).unwrap());
        assert!(!hasher.verify("Secret", &first).unwrap());
    }

    #[test]
    fn malformed_hash_is_credential_error() {
        let err = cheap_hasher().verify("secret", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, TodoError::Credential(_)));
    }

    #[test]
    fn unknown_user_and_wrong_password_look_the_same() {
        let storage = SqliteStorage::open_memory().unwrap();
        let hasher = cheap_hasher();
        let hash = hasher.hash("right").unwrap();
        UserBuilder::new(&storage).build_new("alice", &hash).unwrap();

        let unknown = authenticate(&storage, &hasher, "mallory", "right").unwrap_err();
        let wrong = authenticate(&storage, &hasher, "alice", "wrong").unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(unknown, TodoError::Authentication));
        assert!(matches!(wrong, TodoError::Authentication));
    }

    /// Counts `verify` calls on the way through.
    struct CountingHasher {
        inner: Argon2Hasher,
        verifies: Cell<usize>,
    }

    impl CredentialHasher for CountingHasher {
        fn hash(&self, password: &str) -> Result<String> {
            self.inner.hash(password)
        }

        fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
            self.verifies.set(self.verifies.get() + 1);
            self.inner.verify(password, stored_hash)
        }

        fn decoy_hash(&self) -> Result<String> {
            self.inner.decoy_hash()
        }
    }

    #[test]
    fn unknown_user_costs_one_verification() {
        let storage = SqliteStorage::open_memory().unwrap();
        let hasher = CountingHasher {
            inner: cheap_hasher(),
            verifies: Cell::new(0),
        };
        let hash = hasher.hash("right").unwrap();
        UserBuilder::new(&storage).build_new("alice", &hash).unwrap();

        authenticate(&storage, &hasher, "mallory", "right").unwrap_err();
        assert_eq!(hasher.verifies.get(), 1);

        authenticate(&storage, &hasher, "alice", "wrong").unwrap_err();
        assert_eq!(hasher.verifies.get(), 2);
    }

    #[test]
    fn decoy_hash_is_stable_and_rejects_passwords() {
        let hasher = cheap_hasher();
        let decoy = hasher.decoy_hash().unwrap();
        assert_eq!(hasher.decoy_hash().unwrap(), decoy);
        assert!(decoy.starts_with("$argon2id$"));
        assert!(!hasher.verify("", &decoy).unwrap());
        assert!(!hasher.verify("right", &decoy).unwrap());
    }

    #[test]
    fn successful_login_hydrates_user() {
        let storage = SqliteStorage::open_memory().unwrap();
        let hasher = cheap_hasher();
        let hash = hasher.hash("right").unwrap();
        let registered = UserBuilder::new(&storage).build_new("alice", &hash).unwrap();

        let user = authenticate(&storage, &hasher, "alice", "right").unwrap();
        assert_eq!(user, registered);
    }
}
