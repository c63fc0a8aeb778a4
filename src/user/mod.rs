pub mod auth;
pub mod token;
mod user_manager;

pub use auth::{HashedPassword, PasswordHasher, UsernamePasswordCredentials};
pub use token::{TokenError, TokenIssuer, DEFAULT_TOKEN_LIFETIME, MAX_TOKEN_LIFETIME};
pub use user_manager::{
    AuthenticatedUser, PasswordChange, ProfileUpdate, UserManager, MAX_TOP_USERS,
    MAX_USER_SEARCH_RESULTS,
};
