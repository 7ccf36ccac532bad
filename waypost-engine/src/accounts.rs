//! Account service: signup, login and user listing
//!
//! Argon2 work runs on the blocking pool behind a semaphore, so a burst of
//! signups cannot starve token verification or reads.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task;

use waypost_core::auth::{self, TokenSigner};
use waypost_core::*;

use crate::Store;

/// Bounded executor for the deliberately slow password hashing.
#[derive(Clone)]
pub struct PasswordPool {
    permits: Arc<Semaphore>,
}

impl PasswordPool {
    pub fn new(max_concurrent: usize) -> Self {
        PasswordPool {
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    pub async fn hash(&self, plaintext: String) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        task::spawn_blocking(move || auth::hash_password(&plaintext))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {}", e)))?
    }

    pub async fn verify(&self, plaintext: String, phc: String) -> Result<bool> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        task::spawn_blocking(move || auth::verify_password(&plaintext, &phc))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {}", e)))
    }

    /// Burn one hashing pass; see [`auth::equalize_verify_delay`].
    pub async fn equalize(&self, plaintext: String) -> Result<()> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        task::spawn_blocking(move || auth::equalize_verify_delay(&plaintext))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {}", e)))
    }
}

pub struct AccountService {
    store: Store,
    signer: TokenSigner,
    pool: PasswordPool,
    token_ttl: Duration,
    // Serializes the email-uniqueness check with the linked insert.
    signup_lock: Mutex<()>,
}

impl AccountService {
    pub fn new(
        store: Store,
        signer: TokenSigner,
        pool: PasswordPool,
        token_ttl: Duration,
    ) -> Self {
        AccountService {
            store,
            signer,
            pool,
            token_ttl,
            signup_lock: Mutex::new(()),
        }
    }

    /// Create an account and return a fresh session for it. A duplicate
    /// email (case-insensitive) is a conflict.
    pub async fn signup(&self, new_user: NewUser) -> Result<SessionView> {
        new_user.validate()?;
        let email = new_user.normalized_email();

        // Hash before taking the lock; only the uniqueness check and the
        // insert need to be serialized.
        let password_hash = self.pool.hash(new_user.password.clone()).await?;

        let record = UserRecord {
            id: UserId::generate(),
            name: new_user.name,
            email: email.clone(),
            password_hash,
            image_url: new_user.image_url,
        };

        {
            let _guard = self.signup_lock.lock().await;
            if self.store.email_taken(&email)? {
                return Err(ApiError::Conflict(
                    "email already exists, could not create user".to_string(),
                ));
            }
            self.store.insert_user(&record)?;
        }

        self.session_for(&record)
    }

    /// Verify credentials and return a fresh session. Unknown email and
    /// wrong password are indistinguishable to the caller, in result and
    /// in timing.
    pub async fn login(&self, request: LoginRequest) -> Result<SessionView> {
        let record = match self.store.get_user_by_email(&request.email)? {
            Some(record) => record,
            None => {
                self.pool.equalize(request.password).await?;
                return Err(Self::bad_credentials());
            }
        };

        let ok = self
            .pool
            .verify(request.password, record.password_hash.clone())
            .await?;
        if !ok {
            return Err(Self::bad_credentials());
        }

        self.session_for(&record)
    }

    /// All users with their owned place ids. Password hashes never leave
    /// the store; `UserView` has no field for them.
    pub fn list_users(&self) -> Result<Vec<UserView>> {
        let mut out = Vec::new();
        for record in self.store.users()? {
            let places = self.store.place_ids_by_owner(&record.id)?;
            out.push(UserView::from_record(record, places));
        }
        Ok(out)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    fn bad_credentials() -> ApiError {
        ApiError::Forbidden("could not identify user, credentials may be wrong".to_string())
    }

    fn session_for(&self, record: &UserRecord) -> Result<SessionView> {
        let token = self
            .signer
            .issue(&record.id, &record.email, self.token_ttl)?;
        Ok(SessionView {
            user_id: record.id,
            email: record.email.clone(),
            token,
        })
    }
}
