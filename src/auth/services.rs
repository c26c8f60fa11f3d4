use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64ct::{Base64UrlUnpadded, Encoding};
use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::auth::dto::{SigninRequest, SignupRequest};
use crate::auth::repo::IdentityStore;
use crate::auth::repo_types::{NewUser, User};
use crate::error::{AppError, StoreError, UniqueField};

pub const MIN_PASSWORD_LEN: usize = 6;
const TOKEN_BYTES: usize = 32;
const TOKEN_ATTEMPTS: usize = 3;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    #[cfg(test)]
    VERIFY_CALLS.with(|c| c.set(c.get() + 1));

    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
thread_local! {
    static VERIFY_CALLS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

#[cfg(test)]
pub(crate) fn verify_calls() -> usize {
    VERIFY_CALLS.with(|c| c.get())
}

/// Burns the same argon2 work as a real check so an unknown email costs as
/// much as a wrong password.
fn verify_against_dummy(plain: &str) {
    lazy_static! {
        static ref DUMMY_HASH: String =
            hash_password("folio-dummy-password").unwrap_or_default();
    }
    let _ = verify_password(plain, &DUMMY_HASH);
}

/// Fresh opaque bearer token: 256 random bits, base64url without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Creates the account and its credential. A duplicate email is a
/// validation error on `email`; a token collision is retried.
pub async fn signup(
    store: &dyn IdentityStore,
    payload: SignupRequest,
) -> Result<(User, String), AppError> {
    let payload = payload.validate()?;

    if store.find_user_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::invalid_field("email", "Email already in use"));
    }

    let new = NewUser {
        email: payload.email,
        name: payload.name,
        password_hash: hash_password(&payload.password)?,
    };

    for _ in 0..TOKEN_ATTEMPTS {
        let token = generate_token();
        match store.create_user(new.clone(), &token).await {
            Ok(user) => {
                info!(user_id = %user.id, email = %user.email, "user registered");
                return Ok((user, token));
            }
            // Lost a race with a concurrent signup for the same address.
            Err(StoreError::Duplicate(UniqueField::Email)) => {
                warn!(email = %new.email, "email already registered");
                return Err(AppError::invalid_field("email", "Email already in use"));
            }
            Err(StoreError::Duplicate(UniqueField::Token)) => {
                warn!("token collision on signup; regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(anyhow::anyhow!("could not generate a unique token").into())
}

/// Checks credentials and returns the user's token, issuing one if the
/// account has none yet. Unknown email and wrong password are reported
/// identically.
pub async fn signin(
    store: &dyn IdentityStore,
    payload: SigninRequest,
) -> Result<(User, String), AppError> {
    let payload = payload.validate()?;

    let Some(user) = store.find_user_by_email(&payload.email).await? else {
        verify_against_dummy(&payload.password);
        warn!(email = %payload.email, "signin unknown email");
        return Err(AppError::unauthenticated(INVALID_CREDENTIALS));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "signin invalid password");
        return Err(AppError::unauthenticated(INVALID_CREDENTIALS));
    }

    let token = ensure_token(store, &user).await?;
    info!(user_id = %user.id, "user signed in");
    Ok((user, token))
}

async fn ensure_token(store: &dyn IdentityStore, user: &User) -> Result<String, AppError> {
    for _ in 0..TOKEN_ATTEMPTS {
        match store.ensure_token(user.id, &generate_token()).await {
            Ok(token) => return Ok(token),
            Err(StoreError::Duplicate(UniqueField::Token)) => {
                warn!(user_id = %user.id, "token collision on signin; regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(anyhow::anyhow!("could not generate a unique token").into())
}

/// Resolves a bearer token to its owner; unknown tokens are an
/// authentication failure.
pub async fn authenticate(store: &dyn IdentityStore, token: &str) -> Result<User, AppError> {
    match store.find_user_by_token(token).await? {
        Some(user) => {
            debug!(user_id = %user.id, "token resolved");
            Ok(user)
        }
        None => {
            warn!("unknown bearer token");
            Err(AppError::unauthenticated("Invalid token."))
        }
    }
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse").expect("hashing should succeed");
        assert!(!verify_password("wrong-horse", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@x.io"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        // 32 bytes → 43 base64url chars
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
