use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

lazy_static! {
    // Verified against when the email is unknown so both login failures cost one Argon2 run.
    static ref DUMMY_HASH: String = hash_password("not-a-real-password").unwrap_or_default();
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Burns the same work as a real verification; the result is discarded.
pub fn verify_against_dummy(plain: &str) {
    let _ = verify_password(plain, &DUMMY_HASH);
}

/// Argon2 is CPU-bound; these run it on the blocking pool so a login burst
/// does not stall the async workers.
pub async fn hash_password_async(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

pub async fn verify_password_async(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

pub async fn verify_against_dummy_async(plain: String) {
    if let Err(e) = tokio::task::spawn_blocking(move || verify_against_dummy(&plain)).await {
        error!(error = %e, "dummy verification task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn hashes_are_salted_and_never_plaintext() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2"));
        assert!(!a.contains("same-password"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn blocking_pool_wrappers_agree_with_sync_versions() {
        let hash = hash_password_async("off-the-runtime".into()).await.unwrap();
        assert!(verify_password("off-the-runtime", &hash).unwrap());
        assert!(verify_password_async("off-the-runtime".into(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_async("nope".into(), hash).await.unwrap());
        assert!(verify_password_async("x".into(), "garbage".into())
            .await
            .is_err());
        verify_against_dummy_async("whatever".into()).await;
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        assert!(DUMMY_HASH.starts_with("$argon2"));
        verify_against_dummy("whatever");
    }
}
