//! Request bodies and their validation into typed service inputs.
//!
//! Required fields are `Option` here, a missing one is reported against its
//! field name.

use crate::error::{FieldError, ServiceError};
use crate::store::{NewPlaylist, NewTrack, PlaylistChanges, UserChanges};
use crate::user::{PasswordChange, ProfileUpdate};

use axum::extract::{rejection::JsonRejection, FromRequest, Request};
use axum::Json;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_NAME_LENGTH: usize = 2;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, ServiceError>;
}

/// Like [`Json`], but an unreadable body is reported as a validation error.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(body_rejection)?;
        Ok(JsonBody(body))
    }
}

fn body_rejection(rejection: JsonRejection) -> ServiceError {
    ServiceError::Validation(vec![FieldError::new("body", rejection.body_text())])
}

#[derive(Default)]
struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    fn add(&mut self, field: &str, message: &str) {
        self.0.push(FieldError::new(field, message));
    }

    fn required<'a>(&mut self, field: &str, value: &'a Option<String>) -> Option<&'a str> {
        match value {
            Some(value) => Some(value.as_str()),
            None => {
                self.add(field, &format!("{} is required", field));
                None
            }
        }
    }

    fn min_length(&mut self, field: &str, value: Option<&str>, min: usize, message: &str) {
        if let Some(value) = value {
            if value.chars().count() < min {
                self.add(field, message);
            }
        }
    }

    fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value {
            if !EMAIL_REGEX.is_match(value) {
                self.add(field, "Invalid email format");
            }
        }
    }

    fn url(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value {
            if !is_valid_url(value) {
                self.add(field, "Invalid URL");
            }
        }
    }

    fn finish<T>(self, output: impl FnOnce() -> T) -> Result<T, ServiceError> {
        if self.0.is_empty() {
            Ok(output())
        } else {
            Err(ServiceError::Validation(self.0))
        }
    }
}

fn is_valid_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
        Err(_) => false,
    }
}

#[derive(Deserialize, Debug)]
pub struct RegisterBody {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish()
    }
}

impl Validate for RegisterBody {
    type Output = Registration;

    fn validate(self) -> Result<Registration, ServiceError> {
        let mut errors = FieldErrors::default();
        let email = errors.required("email", &self.email);
        errors.email("email", email);
        let password = errors.required("password", &self.password);
        errors.min_length(
            "password",
            password,
            MIN_PASSWORD_LENGTH,
            "Password must be at least 8 characters long",
        );
        let name = errors.required("name", &self.name);
        errors.min_length(
            "name",
            name,
            MIN_NAME_LENGTH,
            "Name must be at least 2 characters long",
        );
        errors.finish(|| Registration {
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

// Never log the password.
impl std::fmt::Debug for LoginBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginBody")
            .field("email", &self.email)
            .finish()
    }
}

pub struct Login {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login").field("email", &self.email).finish()
    }
}

impl Validate for LoginBody {
    type Output = Login;

    fn validate(self) -> Result<Login, ServiceError> {
        let mut errors = FieldErrors::default();
        let email = errors.required("email", &self.email);
        errors.email("email", email);
        let password = errors.required("password", &self.password);
        errors.min_length("password", password, 1, "Password is required");
        errors.finish(|| Login {
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthProfileBody {
    pub name: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl Validate for AuthProfileBody {
    type Output = ProfileUpdate;

    fn validate(self) -> Result<ProfileUpdate, ServiceError> {
        let mut errors = FieldErrors::default();
        errors.min_length(
            "name",
            self.name.as_deref(),
            MIN_NAME_LENGTH,
            "Name must be at least 2 characters long",
        );
        let password_change = match (self.current_password, self.new_password) {
            (Some(current_password), Some(new_password)) => {
                errors.min_length(
                    "newPassword",
                    Some(new_password.as_str()),
                    MIN_PASSWORD_LENGTH,
                    "Password must be at least 8 characters long",
                );
                Some(PasswordChange {
                    current_password,
                    new_password,
                })
            }
            (Some(_), None) => {
                errors.add("newPassword", "newPassword is required with currentPassword");
                None
            }
            (None, Some(_)) => {
                errors.add(
                    "currentPassword",
                    "currentPassword is required with newPassword",
                );
                None
            }
            (None, None) => None,
        };
        let name = self.name;
        errors.finish(|| ProfileUpdate {
            name,
            password_change,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct UserProfileBody {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl Validate for UserProfileBody {
    type Output = UserChanges;

    fn validate(self) -> Result<UserChanges, ServiceError> {
        let mut errors = FieldErrors::default();
        errors.min_length(
            "name",
            self.name.as_deref(),
            MIN_NAME_LENGTH,
            "Name must be at least 2 characters long",
        );
        errors.url("avatar", self.avatar.as_deref());
        errors.finish(|| UserChanges {
            name: self.name,
            avatar: self.avatar,
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

impl Validate for CreatePlaylistBody {
    type Output = NewPlaylist;

    fn validate(self) -> Result<NewPlaylist, ServiceError> {
        let mut errors = FieldErrors::default();
        let name = errors.required("name", &self.name);
        errors.min_length(
            "name",
            name,
            1,
            "Name required and must be at least 1 character long",
        );
        errors.url("coverImage", self.cover_image.as_deref());
        errors.finish(|| NewPlaylist {
            name: self.name.unwrap_or_default(),
            description: self.description,
            cover_image: self.cover_image,
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaylistBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

impl Validate for UpdatePlaylistBody {
    type Output = PlaylistChanges;

    fn validate(self) -> Result<PlaylistChanges, ServiceError> {
        let mut errors = FieldErrors::default();
        errors.min_length(
            "name",
            self.name.as_deref(),
            1,
            "Playlist name must be at least 1 character long",
        );
        errors.url("coverImage", self.cover_image.as_deref());
        errors.finish(|| PlaylistChanges {
            name: self.name,
            description: self.description,
            cover_image: self.cover_image,
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddTrackBody {
    pub track_id: Option<String>,
}

impl Validate for AddTrackBody {
    type Output = String;

    fn validate(self) -> Result<String, ServiceError> {
        let mut errors = FieldErrors::default();
        if let Some(track_id) = errors.required("trackId", &self.track_id) {
            if uuid::Uuid::parse_str(track_id).is_err() {
                errors.add("trackId", "Invalid track ID");
            }
        }
        errors.finish(|| self.track_id.unwrap_or_default())
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTrackBody {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration_secs: Option<u32>,
}

impl Validate for RegisterTrackBody {
    type Output = NewTrack;

    fn validate(self) -> Result<NewTrack, ServiceError> {
        let mut errors = FieldErrors::default();
        let title = errors.required("title", &self.title);
        errors.min_length("title", title, 1, "Title must be at least 1 character long");
        errors.finish(|| NewTrack {
            title: self.title.unwrap_or_default(),
            artist: self.artist,
            duration_secs: self.duration_secs,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct SearchQuery {
    pub query: Option<String>,
}

impl Validate for SearchQuery {
    type Output = String;

    fn validate(self) -> Result<String, ServiceError> {
        match self.query {
            Some(query) if !query.trim().is_empty() => Ok(query),
            _ => Err(ServiceError::Validation(vec![FieldError::new(
                "query",
                "Search query is required",
            )])),
        }
    }
}
