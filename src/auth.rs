use crate::model::User;
use crate::{Result, RewearError, UserId};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const ACCESS_TOKEN: &str = "access";
pub const REFRESH_TOKEN: &str = "refresh";

/// Claims carried by both token kinds; `token_type` tells them apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub full_name: String,
    pub token_type: String,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId> {
        Ok(UserId::parse_str(&self.sub)?)
    }
}

/// Issues and validates HS256 token pairs.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: String, access_ttl_hours: i64, refresh_ttl_days: i64) -> Self {
        Self {
            secret,
            access_ttl: Duration::hours(access_ttl_hours),
            refresh_ttl: Duration::days(refresh_ttl_days),
        }
    }

    /// Access and refresh tokens for `user`, in that order.
    pub fn issue_pair(&self, user: &User) -> Result<(String, String)> {
        let access = self.issue(user, ACCESS_TOKEN, self.access_ttl)?;
        let refresh = self.issue(user, REFRESH_TOKEN, self.refresh_ttl)?;
        Ok((access, refresh))
    }

    pub fn issue_access(&self, user: &User) -> Result<String> {
        self.issue(user, ACCESS_TOKEN, self.access_ttl)
    }

    fn issue(&self, user: &User, token_type: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            token_type: token_type.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| RewearError::Auth(format!("Failed to issue token: {}", e)))
    }

    /// Checks signature and expiry, then requires the expected token type.
    pub fn validate(&self, token: &str, expected_type: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| RewearError::Auth(format!("Invalid token: {}", e)))?;

        if claims.token_type != expected_type {
            return Err(RewearError::Auth(format!(
                "Wrong token type, expected {}",
                expected_type
            )));
        }
        Ok(claims)
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| RewearError::Auth(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Ok(false) is a wrong password; Err means the stored hash was unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| RewearError::Auth(format!("Stored credential unreadable: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(RewearError::Auth(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}
