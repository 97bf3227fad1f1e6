//! Signed access-token encoding and verification.
//!
//! Tokens are HS256-signed JWTs carrying a point-in-time snapshot of the
//! user's effective roles and permissions. Authorization decisions depend
//! only on the token itself plus the revocation ledger; the store is never
//! re-queried per request.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult, AuthenticatedUser};
use uuid::Uuid;

/// Minimum accepted signing-secret length in bytes.
pub const JWT_SECRET_MIN_LENGTH: usize = 32;

/// Default token lifetime in minutes.
pub const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 60;

/// Signing configuration loaded once at startup.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Symmetric signing secret.
    pub secret: String,
    /// Token lifetime in minutes.
    pub lifetime_minutes: i64,
    /// Optional issuer; validated only when set.
    pub issuer: Option<String>,
    /// Optional audience; validated only when set.
    pub audience: Option<String>,
}

impl JwtConfig {
    /// Creates a configuration with the default lifetime and no
    /// issuer/audience validation.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            lifetime_minutes: DEFAULT_TOKEN_LIFETIME_MINUTES,
            issuer: None,
            audience: None,
        }
    }

    /// Sets the token lifetime in minutes.
    #[must_use]
    pub fn with_lifetime_minutes(mut self, minutes: i64) -> Self {
        self.lifetime_minutes = minutes;
        self
    }

    /// Sets the issuer claim and enables its validation.
    #[must_use]
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Sets the audience claim and enables its validation.
    #[must_use]
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }
}

/// Claims embedded in an issued access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: the user identifier.
    pub sub: String,
    /// Principal name: the username.
    pub name: String,
    /// Unique token identifier used as the revocation key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Issuer, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// One entry per effective role, for role-based checks.
    #[serde(default)]
    pub role: Vec<String>,
    /// One entry per effective permission, the contract for `Perm:` policies.
    #[serde(default)]
    pub perm: Vec<String>,
    /// JSON-serialized role array for client-side consumption only.
    #[serde(default)]
    pub roles: String,
    /// JSON-serialized permission array for client-side consumption only.
    #[serde(default)]
    pub perms: String,
}

impl AccessTokenClaims {
    /// Returns the embedded expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Reconstructs the caller identity from verified claims.
    pub fn to_authenticated_user(&self) -> AppResult<AuthenticatedUser> {
        let user_id = Uuid::parse_str(self.sub.as_str())
            .map_err(|_| AppError::Unauthorized("invalid or expired token".to_owned()))?;

        Ok(AuthenticatedUser::new(
            user_id,
            self.name.clone(),
            self.jti.clone(),
            self.role.clone(),
            self.perm.clone(),
        ))
    }
}

/// A freshly minted token together with its claims.
#[derive(Debug, Clone)]
pub struct MintedToken {
    /// Compact serialized JWT.
    pub token: String,
    /// The claims embedded in the token.
    pub claims: AccessTokenClaims,
}

/// Encoder/verifier around the process-wide signing key.
///
/// Constructed once at startup; misconfiguration fails there, never per
/// request. The keys are read-only afterwards and safe to share across
/// concurrent issuances.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl TokenCodec {
    /// Builds a codec from the signing configuration.
    ///
    /// Fails when the secret is shorter than [`JWT_SECRET_MIN_LENGTH`] or the
    /// lifetime is not positive.
    pub fn new(config: JwtConfig) -> AppResult<Self> {
        if config.secret.len() < JWT_SECRET_MIN_LENGTH {
            return Err(AppError::Validation(format!(
                "JWT secret must be at least {JWT_SECRET_MIN_LENGTH} bytes"
            )));
        }

        if config.lifetime_minutes <= 0 {
            return Err(AppError::Validation(
                "token lifetime must be a positive number of minutes".to_owned(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = config.issuer.as_deref() {
            validation.set_issuer(&[issuer]);
        }
        match config.audience.as_deref() {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        })
    }

    /// Returns the configured token lifetime.
    #[must_use]
    pub fn lifetime(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.config.lifetime_minutes)
    }

    /// Mints a signed token embedding the given role/permission snapshot.
    ///
    /// Every call produces a fresh `jti`; token identifiers are never reused.
    pub fn mint(
        &self,
        user_id: Uuid,
        username: &str,
        roles: &[String],
        permissions: &[String],
    ) -> AppResult<MintedToken> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.lifetime();

        let roles_json = serde_json::to_string(roles)
            .map_err(|error| AppError::Internal(format!("failed to serialize roles: {error}")))?;
        let perms_json = serde_json::to_string(permissions).map_err(|error| {
            AppError::Internal(format!("failed to serialize permissions: {error}"))
        })?;

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            name: username.to_owned(),
            jti: Some(Uuid::new_v4().to_string()),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            role: roles.to_vec(),
            perm: permissions.to_vec(),
            roles: roles_json,
            perms: perms_json,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("failed to sign token: {error}")))?;

        Ok(MintedToken { token, claims })
    }

    /// Verifies a compact token and returns its claims.
    ///
    /// All verification failures collapse into one generic unauthorized
    /// error; callers never learn whether a token was malformed, tampered
    /// with, or expired.
    pub fn verify(&self, token: &str) -> AppResult<AccessTokenClaims> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("invalid or expired token".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::AppResult;
    use uuid::Uuid;

    use super::{JwtConfig, TokenCodec};

    fn codec() -> AppResult<TokenCodec> {
        TokenCodec::new(JwtConfig::new("0123456789abcdef0123456789abcdef"))
    }

    #[test]
    fn short_secret_is_rejected_at_construction() {
        let result = TokenCodec::new(JwtConfig::new("too-short"));
        assert!(result.is_err());
    }

    #[test]
    fn minted_tokens_verify_and_carry_the_snapshot() -> AppResult<()> {
        let codec = codec()?;
        let user_id = Uuid::new_v4();
        let minted = codec.mint(
            user_id,
            "alice",
            &["Admin".to_owned()],
            &["Users.Read".to_owned(), "Users.Update".to_owned()],
        )?;

        let claims = codec.verify(&minted.token)?;
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.name, "alice");
        assert_eq!(claims.role, vec!["Admin".to_owned()]);
        assert_eq!(
            claims.perm,
            vec!["Users.Read".to_owned(), "Users.Update".to_owned()]
        );
        assert_eq!(claims.perms, r#"["Users.Read","Users.Update"]"#);
        assert!(claims.jti.is_some());
        assert!(claims.exp > claims.iat);
        Ok(())
    }

    #[test]
    fn each_mint_produces_a_fresh_jti() -> AppResult<()> {
        let codec = codec()?;
        let user_id = Uuid::new_v4();
        let first = codec.mint(user_id, "alice", &[], &[])?;
        let second = codec.mint(user_id, "alice", &[], &[])?;
        assert_ne!(first.claims.jti, second.claims.jti);
        Ok(())
    }

    #[test]
    fn tampered_tokens_are_rejected() -> AppResult<()> {
        let codec = codec()?;
        let minted = codec.mint(Uuid::new_v4(), "alice", &[], &[])?;

        let other = TokenCodec::new(JwtConfig::new("ffffffffffffffffffffffffffffffff"))?;
        assert!(other.verify(&minted.token).is_err());
        Ok(())
    }

    #[test]
    fn issuer_mismatch_fails_verification() -> AppResult<()> {
        let issuing = TokenCodec::new(
            JwtConfig::new("0123456789abcdef0123456789abcdef")
                .with_issuer(Some("tessera".to_owned())),
        )?;
        let expecting_other = TokenCodec::new(
            JwtConfig::new("0123456789abcdef0123456789abcdef")
                .with_issuer(Some("someone-else".to_owned())),
        )?;

        let minted = issuing.mint(Uuid::new_v4(), "alice", &[], &[])?;
        assert!(issuing.verify(&minted.token).is_ok());
        assert!(expecting_other.verify(&minted.token).is_err());
        Ok(())
    }

    #[test]
    fn claims_convert_to_an_authenticated_user() -> AppResult<()> {
        let codec = codec()?;
        let user_id = Uuid::new_v4();
        let minted = codec.mint(user_id, "alice", &["Ops".to_owned()], &["Logs.Read".to_owned()])?;

        let user = minted.claims.to_authenticated_user()?;
        assert_eq!(user.user_id(), user_id);
        assert!(user.has_role("Ops"));
        assert!(user.has_permission("Logs.Read"));
        assert_eq!(user.token_id(), minted.claims.jti.as_deref());
        Ok(())
    }
}
