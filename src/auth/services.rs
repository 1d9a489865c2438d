use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{RegisterRequest, UpdateProfileRequest},
        password::{hash_password_async, verify_against_dummy_async, verify_password_async},
        repo_types::{NewUser, ProfilePatch, User},
    },
    db::Store,
    error::{AppError, AppResult},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Blank strings count as absent.
fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[instrument(skip(store, req))]
pub async fn register(store: &dyn Store, req: RegisterRequest) -> AppResult<User> {
    let (Some(email), Some(password), Some(name)) =
        (non_blank(req.email), req.password.filter(|p| !p.is_empty()), non_blank(req.name))
    else {
        return Err(AppError::validation(
            "Email, password, and name are required",
        ));
    };

    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password_async(password).await?;
    let user = store
        .insert_user(NewUser {
            email,
            password_hash,
            name,
            phone: non_blank(req.phone),
            role: req.user_type.unwrap_or_default(),
        })
        .await
        .map_err(|e| {
            if matches!(e, AppError::Conflict(_)) {
                warn!("email already registered");
            }
            e
        })?;

    info!(user_id = %user.id, role = user.role.as_str(), "user registered");
    Ok(user)
}

/// Unknown email and wrong password are indistinguishable to the caller:
/// same error, and both paths run one Argon2 verification.
#[instrument(skip(store, password))]
pub async fn authenticate(
    store: &dyn Store,
    email: Option<String>,
    password: Option<String>,
) -> AppResult<User> {
    let (Some(email), Some(password)) = (non_blank(email), password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::validation("Email and password are required"));
    };
    let email = normalize_email(&email);

    let Some(user) = store.find_user_by_email(&email).await? else {
        verify_against_dummy_async(password).await;
        warn!("login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password_async(password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

pub async fn profile(store: &dyn Store, user_id: Uuid) -> AppResult<User> {
    store
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found"))
}

#[instrument(skip(store, req))]
pub async fn update_profile(
    store: &dyn Store,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<User> {
    if matches!(&req.name, Some(n) if n.trim().is_empty()) {
        return Err(AppError::validation("Name cannot be empty"));
    }
    let patch = ProfilePatch {
        name: req.name.map(|n| n.trim().to_string()),
        phone: req.phone.map(|p| p.trim().to_string()),
    };
    let user = store
        .update_profile(user_id, patch)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}
