//! Token issuance and verification.
//!
//! Tokens are compact JWS strings signed with a shared HMAC secret. The
//! verifier inspects the declared algorithm itself before handing the token
//! to `jsonwebtoken`, so a token that names anything outside the HMAC family
//! is rejected no matter what the library would otherwise accept.

use std::collections::HashSet;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::claims::{Identity, TokenClaims, TokenPair};

/// Algorithm used for every token this service signs.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Algorithms a presented token may declare.
const HMAC_FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
const HMAC_FAMILY_NAMES: [&str; 3] = ["HS256", "HS384", "HS512"];

/// Shared signing secret, built once at startup and injected.
#[derive(Clone)]
pub struct SigningSecret(Arc<[u8]>);

impl SigningSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(secret.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SigningSecret").field(&"<redacted>").finish()
    }
}

/// Lifetimes for the two halves of a token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    access: Duration,
    refresh: Duration,
}

/// Rejected lifetime combinations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifetimeError {
    #[error("token lifetimes must be positive")]
    NotPositive,

    #[error("access token lifetime ({access}s) must be shorter than refresh token lifetime ({refresh}s)")]
    AccessNotShorter { access: i64, refresh: i64 },

    #[error("token lifetime of {0}s is out of range")]
    OutOfRange(u64),
}

impl TokenLifetimes {
    /// Fifteen minutes.
    pub const DEFAULT_ACCESS_SECS: u64 = 15 * 60;
    /// Thirty days.
    pub const DEFAULT_REFRESH_SECS: u64 = 30 * 24 * 60 * 60;

    /// Build lifetimes, requiring `0 < access < refresh`.
    pub fn new(access: Duration, refresh: Duration) -> Result<Self, LifetimeError> {
        if access <= Duration::zero() || refresh <= Duration::zero() {
            return Err(LifetimeError::NotPositive);
        }
        if access >= refresh {
            return Err(LifetimeError::AccessNotShorter {
                access: access.num_seconds(),
                refresh: refresh.num_seconds(),
            });
        }
        Ok(Self { access, refresh })
    }

    pub fn from_secs(access_secs: u64, refresh_secs: u64) -> Result<Self, LifetimeError> {
        Self::new(seconds(access_secs)?, seconds(refresh_secs)?)
    }

    pub fn access(&self) -> Duration {
        self.access
    }

    pub fn refresh(&self) -> Duration {
        self.refresh
    }
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::seconds(Self::DEFAULT_ACCESS_SECS as i64),
            refresh: Duration::seconds(Self::DEFAULT_REFRESH_SECS as i64),
        }
    }
}

fn seconds(secs: u64) -> Result<Duration, LifetimeError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or(LifetimeError::OutOfRange(secs))
}

/// Token signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing key is empty")]
    EmptyKey,

    #[error("failed to sign token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

/// Something that can mint a token pair for an identity.
pub trait TokenGenerator: Send + Sync {
    fn generate_tokens(&self, identity: &Identity) -> Result<TokenPair, SigningError>;
}

/// Mints access/refresh token pairs.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: SigningSecret,
    encoding_key: EncodingKey,
    lifetimes: TokenLifetimes,
}

impl TokenIssuer {
    pub fn new(secret: SigningSecret, lifetimes: TokenLifetimes) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        Self {
            secret,
            encoding_key,
            lifetimes,
        }
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Mint a pair as of `now`. Both tokens share the same issue instant.
    pub fn generate_tokens_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, SigningError> {
        if self.secret.is_empty() {
            return Err(SigningError::EmptyKey);
        }

        let access_token = self.sign(identity, now, self.lifetimes.access)?;
        let refresh_token = self.sign(identity, now, self.lifetimes.refresh)?;

        Ok(TokenPair {
            id: identity.clone(),
            access_token,
            refresh_token,
        })
    }

    fn sign(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, SigningError> {
        let claims = TokenClaims {
            id: identity.as_str().to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        Ok(encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            &self.encoding_key,
        )?)
    }
}

impl TokenGenerator for TokenIssuer {
    fn generate_tokens(&self, identity: &Identity) -> Result<TokenPair, SigningError> {
        self.generate_tokens_at(identity, Utc::now())
    }
}

/// Result of verifying a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Correctly signed and unexpired.
    Verified(Identity),
    /// Correctly signed but past its expiry.
    Expired,
    /// Wrong key, tampered content, or a non-HMAC algorithm.
    InvalidSignature,
    /// Not a token at all, or claims that cannot be decoded.
    Malformed,
    /// Nothing was presented.
    MissingCredential,
}

impl AuthOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Verified(_) => "verified",
            Self::Expired => "expired",
            Self::InvalidSignature => "invalid_signature",
            Self::Malformed => "malformed",
            Self::MissingCredential => "missing_credential",
        }
    }
}

/// Checks signature, algorithm family and expiry of presented tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: SigningSecret,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: SigningSecret) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = HMAC_FAMILY.to_vec();
        validation.leeway = 0;
        // Expiry is compared against the caller's clock in `verify_token_at`.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            secret,
            decoding_key,
            validation,
        }
    }

    pub fn verify_token(&self, token: &str) -> AuthOutcome {
        self.verify_token_at(token, Utc::now())
    }

    /// Verify `token` as of `now`.
    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> AuthOutcome {
        let Some(alg) = declared_algorithm(token) else {
            return AuthOutcome::Malformed;
        };
        if !HMAC_FAMILY_NAMES.contains(&alg.as_str()) {
            debug!(alg = %alg, "rejecting token with non-HMAC algorithm");
            return AuthOutcome::InvalidSignature;
        }

        // An empty key would verify anything signed with an empty key.
        if self.secret.is_empty() {
            return AuthOutcome::InvalidSignature;
        }

        let claims = match decode::<TokenClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(err) => {
                debug!(error = %err, "token rejected");
                return outcome_for(err.kind());
            }
        };

        let Ok(identity) = Identity::new(claims.id) else {
            return AuthOutcome::Malformed;
        };

        if now.timestamp() >= claims.exp {
            return AuthOutcome::Expired;
        }

        AuthOutcome::Verified(identity)
    }
}

fn outcome_for(kind: &ErrorKind) -> AuthOutcome {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat => AuthOutcome::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthOutcome::Expired,
        _ => AuthOutcome::Malformed,
    }
}

#[derive(Deserialize)]
struct UntrustedHeader {
    alg: String,
}

/// Read the `alg` a token declares without trusting anything else in it.
fn declared_algorithm(token: &str) -> Option<String> {
    let mut segments = token.split('.');
    let header = segments.next()?;
    if segments.count() != 2 {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(header).ok()?;
    let header: UntrustedHeader = serde_json::from_slice(&bytes).ok()?;
    Some(header.alg)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEAM_ID: &str = "76561198000000000";

    fn secret() -> SigningSecret {
        SigningSecret::new("secret")
    }

    fn identity() -> Identity {
        Identity::new(STEAM_ID).unwrap()
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(secret(), TokenLifetimes::default())
    }

    fn decode_unverified(token: &str) -> TokenClaims {
        let payload = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
    }

    fn forge(header: &str, claims: &TokenClaims, signature: &str) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap()),
            signature
        )
    }

    #[test]
    fn test_lifetimes_require_access_shorter_than_refresh() {
        let defaults = TokenLifetimes::default();
        assert!(defaults.access() < defaults.refresh());

        assert!(matches!(
            TokenLifetimes::from_secs(3600, 3600),
            Err(LifetimeError::AccessNotShorter { .. })
        ));
        assert!(matches!(
            TokenLifetimes::from_secs(7200, 3600),
            Err(LifetimeError::AccessNotShorter { .. })
        ));
        assert_eq!(
            TokenLifetimes::from_secs(0, 3600),
            Err(LifetimeError::NotPositive)
        );
        assert!(TokenLifetimes::from_secs(60, 61).is_ok());
        assert_eq!(
            TokenLifetimes::from_secs(u64::MAX, u64::MAX),
            Err(LifetimeError::OutOfRange(u64::MAX))
        );
    }

    #[test]
    fn test_generated_claims_carry_identity_and_ttls() {
        let now = Utc::now();
        let pair = issuer().generate_tokens_at(&identity(), now).unwrap();
        assert_eq!(pair.id, identity());

        let access = decode_unverified(&pair.access_token);
        let refresh = decode_unverified(&pair.refresh_token);
        assert_eq!(access.id, STEAM_ID);
        assert_eq!(refresh.id, STEAM_ID);

        let access_ttl = access.exp - now.timestamp();
        let refresh_ttl = refresh.exp - now.timestamp();
        assert!((access_ttl - TokenLifetimes::DEFAULT_ACCESS_SECS as i64).abs() <= 1);
        assert!((refresh_ttl - TokenLifetimes::DEFAULT_REFRESH_SECS as i64).abs() <= 1);
        assert!(access.exp < refresh.exp);
    }

    #[test]
    fn test_tokens_declare_hs256() {
        let pair = issuer().generate_tokens(&identity()).unwrap();
        let header = jsonwebtoken::decode_header(&pair.access_token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }

    #[test]
    fn test_fresh_access_and_refresh_tokens_verify() {
        let pair = issuer().generate_tokens(&identity()).unwrap();
        let verifier = TokenVerifier::new(secret());

        assert_eq!(
            verifier.verify_token(&pair.access_token),
            AuthOutcome::Verified(identity())
        );
        assert_eq!(
            verifier.verify_token(&pair.refresh_token),
            AuthOutcome::Verified(identity())
        );
    }

    #[test]
    fn test_round_trip_for_assorted_identities() {
        let issuer = issuer();
        let verifier = TokenVerifier::new(secret());
        for raw in ["1", STEAM_ID, "player-with-dashes", "ユーザー"] {
            let id = Identity::new(raw).unwrap();
            let pair = issuer.generate_tokens(&id).unwrap();
            assert_eq!(
                verifier.verify_token(&pair.access_token),
                AuthOutcome::Verified(id)
            );
        }
    }

    #[test]
    fn test_access_token_expires_before_refresh_token() {
        let issued = Utc::now();
        let pair = issuer().generate_tokens_at(&identity(), issued).unwrap();
        let verifier = TokenVerifier::new(secret());

        let later = issued + Duration::hours(1);
        assert_eq!(
            verifier.verify_token_at(&pair.access_token, later),
            AuthOutcome::Expired
        );
        assert_eq!(
            verifier.verify_token_at(&pair.refresh_token, later),
            AuthOutcome::Verified(identity())
        );

        let much_later = issued + Duration::days(31);
        assert_eq!(
            verifier.verify_token_at(&pair.refresh_token, much_later),
            AuthOutcome::Expired
        );
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let issued = Utc::now();
        let pair = issuer().generate_tokens_at(&identity(), issued).unwrap();
        let exp = decode_unverified(&pair.access_token).exp;
        let verifier = TokenVerifier::new(secret());

        let just_before = DateTime::from_timestamp(exp - 1, 0).unwrap();
        let at_expiry = DateTime::from_timestamp(exp, 0).unwrap();
        assert!(matches!(
            verifier.verify_token_at(&pair.access_token, just_before),
            AuthOutcome::Verified(_)
        ));
        assert_eq!(
            verifier.verify_token_at(&pair.access_token, at_expiry),
            AuthOutcome::Expired
        );
    }

    #[test]
    fn test_other_key_is_invalid_signature_even_when_expired() {
        let other = TokenIssuer::new(SigningSecret::new("another-secret"), TokenLifetimes::default());
        let issued = Utc::now() - Duration::days(90);
        let fresh = other.generate_tokens(&identity()).unwrap();
        let stale = other.generate_tokens_at(&identity(), issued).unwrap();
        let verifier = TokenVerifier::new(secret());

        assert_eq!(
            verifier.verify_token(&fresh.access_token),
            AuthOutcome::InvalidSignature
        );
        assert_eq!(
            verifier.verify_token(&stale.access_token),
            AuthOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_tampered_payload_is_invalid_signature() {
        let pair = issuer().generate_tokens(&identity()).unwrap();
        let mut parts: Vec<String> = pair.access_token.split('.').map(String::from).collect();
        let mut claims = decode_unverified(&pair.access_token);
        claims.id = "76561198999999999".to_string();
        parts[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

        let verifier = TokenVerifier::new(secret());
        assert_eq!(
            verifier.verify_token(&parts.join(".")),
            AuthOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_non_hmac_algorithms_are_invalid_signature() {
        let claims = TokenClaims {
            id: STEAM_ID.to_string(),
            exp: Utc::now().timestamp() + 600,
            iat: Utc::now().timestamp(),
        };
        let verifier = TokenVerifier::new(secret());

        let unsigned = forge(r#"{"alg":"none","typ":"JWT"}"#, &claims, "");
        assert_eq!(verifier.verify_token(&unsigned), AuthOutcome::InvalidSignature);

        // HMAC-signed body under an RS256 header: the classic substitution.
        let genuine = issuer().generate_tokens(&identity()).unwrap().access_token;
        let signature = genuine.rsplit('.').next().unwrap();
        let substituted = forge(r#"{"alg":"RS256","typ":"JWT"}"#, &claims, signature);
        assert_eq!(
            verifier.verify_token(&substituted),
            AuthOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_other_hmac_family_members_are_accepted() {
        let claims = TokenClaims {
            id: STEAM_ID.to_string(),
            exp: Utc::now().timestamp() + 600,
            iat: Utc::now().timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert_eq!(
            TokenVerifier::new(secret()).verify_token(&token),
            AuthOutcome::Verified(identity())
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let verifier = TokenVerifier::new(secret());
        for token in ["", "not-a-token", "a.b", "a.b.c.d", "!!!.???.***"] {
            assert_eq!(verifier.verify_token(token), AuthOutcome::Malformed, "{token}");
        }
    }

    #[test]
    fn test_missing_exp_is_malformed() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({"id": STEAM_ID}),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert_eq!(
            TokenVerifier::new(secret()).verify_token(&token),
            AuthOutcome::Malformed
        );
    }

    #[test]
    fn test_empty_subject_is_malformed() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &TokenClaims {
                id: String::new(),
                exp: Utc::now().timestamp() + 600,
                iat: 0,
            },
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert_eq!(
            TokenVerifier::new(secret()).verify_token(&token),
            AuthOutcome::Malformed
        );
    }

    #[test]
    fn test_empty_key_fails_signing_and_verification() {
        let empty = SigningSecret::new("");
        let issuer = TokenIssuer::new(empty.clone(), TokenLifetimes::default());
        assert!(matches!(
            issuer.generate_tokens(&identity()),
            Err(SigningError::EmptyKey)
        ));

        let token = encode(
            &Header::new(Algorithm::HS256),
            &TokenClaims {
                id: STEAM_ID.to_string(),
                exp: Utc::now().timestamp() + 600,
                iat: 0,
            },
            &EncodingKey::from_secret(b""),
        )
        .unwrap();
        assert_eq!(
            TokenVerifier::new(empty).verify_token(&token),
            AuthOutcome::InvalidSignature
        );
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        assert_eq!(format!("{:?}", secret()), r#"SigningSecret("<redacted>")"#);
    }
}
