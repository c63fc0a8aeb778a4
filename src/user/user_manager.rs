use super::auth::HashedPassword;
use super::token::TokenIssuer;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{FullStore, User, UserChanges, UserListing, UserProfile};

use lazy_static::lazy_static;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const MAX_USER_SEARCH_RESULTS: usize = 10;
pub const MAX_TOP_USERS: usize = 5;

lazy_static! {
    // Verified against when the email is unknown, so both failures cost one hash.
    static ref DUMMY_PASSWORD: Option<HashedPassword> =
        HashedPassword::new("dummy-password-never-matches").ok();
}

fn verify_dummy_password(password: &str) {
    if let Some(dummy) = DUMMY_PASSWORD.as_ref() {
        let _ = dummy.verify(password);
    }
}

/// Returned by registration and login.
#[derive(Serialize, Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub password_change: Option<PasswordChange>,
}

pub struct UserManager {
    store: Arc<dyn FullStore>,
    token_issuer: Arc<TokenIssuer>,
}

impl UserManager {
    pub fn new(store: Arc<dyn FullStore>, token_issuer: Arc<TokenIssuer>) -> Self {
        Self {
            store,
            token_issuer,
        }
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> ServiceResult<AuthenticatedUser> {
        let hashed = HashedPassword::new(password)?;
        let user = self
            .store
            .create_user(email, name, &hashed)?
            .ok_or(ServiceError::DuplicateEmail)?;
        info!("Registered user {}", user.id);

        let token = self.token_issuer.issue(&user.id)?;
        Ok(AuthenticatedUser { user, token })
    }

    /// Unknown email and wrong password fail with the same error.
    pub fn login(&self, email: &str, password: &str) -> ServiceResult<AuthenticatedUser> {
        let Some(user) = self.store.get_user_by_email(email)? else {
            debug!("Login attempt for unknown email");
            verify_dummy_password(password);
            return Err(ServiceError::InvalidCredentials);
        };
        let Some(credentials) = self.store.get_password_credentials(&user.id)? else {
            verify_dummy_password(password);
            return Err(ServiceError::InvalidCredentials);
        };

        let verified = credentials.password.verify(password)?;
        self.store.record_login_attempt(&user.id, verified)?;
        if !verified {
            debug!("Wrong password for user {}", user.id);
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.token_issuer.issue(&user.id)?;
        Ok(AuthenticatedUser { user, token })
    }

    pub fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> ServiceResult<User> {
        let new_password = match &update.password_change {
            Some(change) => {
                let credentials = self
                    .store
                    .get_password_credentials(user_id)?
                    .ok_or(ServiceError::UserNotFound)?;
                if !credentials.password.verify(&change.current_password)? {
                    return Err(ServiceError::InvalidPassword);
                }
                Some(HashedPassword::new(&change.new_password)?)
            }
            None => None,
        };

        let changes = UserChanges {
            name: update.name,
            avatar: None,
        };
        let user = self
            .store
            .update_user(user_id, &changes, new_password.as_ref())?
            .ok_or(ServiceError::UserNotFound)?;
        if new_password.is_some() {
            info!("User {} changed password", user_id);
        }
        Ok(user)
    }

    pub fn get_profile(&self, user_id: &str) -> ServiceResult<User> {
        self.store
            .get_user(user_id)?
            .ok_or(ServiceError::UserNotFound)
    }

    /// Looks up the user a verified token refers to, which may have been removed since.
    pub fn find_user(&self, user_id: &str) -> ServiceResult<Option<User>> {
        Ok(self.store.get_user(user_id)?)
    }

    pub fn update_user(&self, user_id: &str, changes: UserChanges) -> ServiceResult<User> {
        self.store
            .update_user(user_id, &changes, None)?
            .ok_or(ServiceError::UserNotFound)
    }

    pub fn get_user_profile(&self, user_id: &str) -> ServiceResult<UserProfile> {
        self.store
            .get_user_profile(user_id)?
            .ok_or(ServiceError::UserNotFound)
    }

    pub fn search_users(
        &self,
        query: &str,
        exclude_user_id: &str,
    ) -> ServiceResult<Vec<UserListing>> {
        Ok(self
            .store
            .search_users(query, exclude_user_id, MAX_USER_SEARCH_RESULTS)?)
    }

    pub fn get_top_users(&self) -> ServiceResult<Vec<UserListing>> {
        Ok(self.store.get_top_users(MAX_TOP_USERS)?)
    }
}
