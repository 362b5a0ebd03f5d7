//! Manage json web tokens.
//!
//! Tokens are signed with a symmetric MAC from the HMAC-SHA2 family. The
//! verifier pins that family itself and never trusts the `alg` header of an
//! untrusted token.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode,
    decode_header, encode,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Algorithms a token may be verified with.
pub const ALLOWED_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated principal.
    pub sub: String,
    /// Identifies the time at which the JWT was issued.
    pub iat: i64,
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: i64,
}

impl Claims {
    /// Create claims for `subject` valid `ttl` seconds from `now`.
    pub fn new(subject: impl Into<String>, now: i64, ttl: i64) -> Result<Self> {
        if ttl <= 0 {
            return Err(Error::InvalidTtl(ttl));
        }

        Ok(Self {
            sub: subject.into(),
            iat: now,
            exp: now.checked_add(ttl).ok_or(Error::InvalidTtl(ttl))?,
        })
    }

    /// Duration between issuance and expiry, in seconds.
    pub fn ttl(&self) -> i64 {
        self.exp.saturating_sub(self.iat)
    }

    /// Expiry is exclusive: a token expiring exactly at `now` is expired.
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp <= now
    }
}

/// Reasons a token string is refused by the verifier.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("signature does not match")]
    InvalidSignature,
    #[error("unexpected signing method: {0:?}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("malformed token")]
    Malformed(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => VerificationError::InvalidSignature,
            _ => VerificationError::Malformed(err),
        }
    }
}

/// Produces and checks signed tokens.
pub trait TokenSigner: Send + Sync {
    /// Sign `claims` with `secret`.
    fn sign(&self, claims: &Claims, secret: &[u8]) -> Result<String>;

    /// Decode and check a token, returning its claims.
    ///
    /// Expiry is not checked here.
    fn verify(
        &self,
        token: &str,
        secret: &[u8],
    ) -> std::result::Result<Claims, VerificationError>;
}

/// JWT signer using HMAC-SHA2.
#[derive(Clone, Debug)]
pub struct HmacSigner {
    algorithm: Algorithm,
}

impl HmacSigner {
    /// Create a new [`HmacSigner`] issuing tokens with `algorithm`.
    pub fn new(
        algorithm: Algorithm,
    ) -> std::result::Result<Self, VerificationError> {
        if !ALLOWED_ALGORITHMS.contains(&algorithm) {
            return Err(VerificationError::UnsupportedAlgorithm(algorithm));
        }

        Ok(Self { algorithm })
    }

    /// Algorithm used on issued tokens.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl Default for HmacSigner {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::HS256,
        }
    }
}

impl TokenSigner for HmacSigner {
    fn sign(&self, claims: &Claims, secret: &[u8]) -> Result<String> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &EncodingKey::from_secret(secret))
            .map_err(Error::Signing)
    }

    fn verify(
        &self,
        token: &str,
        secret: &[u8],
    ) -> std::result::Result<Claims, VerificationError> {
        let header = decode_header(token)?;
        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            return Err(VerificationError::UnsupportedAlgorithm(header.alg));
        }

        let mut validation = Validation::new(self.algorithm);
        validation.algorithms = ALLOWED_ALGORITHMS.to_vec();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)?
            .claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"YourSecretKey123";
    const NOW: i64 = 1_700_000_000;

    fn token() -> String {
        let claims = Claims::new("user123", NOW, 3600).unwrap();
        HmacSigner::default().sign(&claims, SECRET).unwrap()
    }

    #[test]
    fn test_claims() {
        let claims = Claims::new("user123", NOW, 60).unwrap();
        assert_eq!(claims.exp, NOW + 60);
        assert_eq!(claims.ttl(), 60);
        assert!(!claims.is_expired(NOW + 59));
        assert!(claims.is_expired(NOW + 60));

        assert!(matches!(
            Claims::new("user123", NOW, 0),
            Err(Error::InvalidTtl(0))
        ));
        assert!(matches!(
            Claims::new("user123", NOW, -5),
            Err(Error::InvalidTtl(-5))
        ));
        assert!(matches!(
            Claims::new("user123", NOW, i64::MAX),
            Err(Error::InvalidTtl(_))
        ));
    }

    #[test]
    fn test_sign_and_verify() {
        let claims = HmacSigner::default().verify(&token(), SECRET).unwrap();
        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + 3600);
    }

    #[test]
    fn test_verify_ignores_expiry() {
        // Old enough for `jsonwebtoken` to refuse it on its own.
        let claims = Claims::new("user123", 1_000, 1).unwrap();
        let token = HmacSigner::default().sign(&claims, SECRET).unwrap();

        assert_eq!(HmacSigner::default().verify(&token, SECRET).unwrap(), claims);
    }

    #[test]
    fn test_wrong_secret() {
        assert!(matches!(
            HmacSigner::default().verify(&token(), b"AnotherSecret"),
            Err(VerificationError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_token() {
        let token = token();
        let signer = HmacSigner::default();

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] ^= 0x01;
            let tampered = String::from_utf8_lossy(&bytes);

            assert!(
                signer.verify(&tampered, SECRET).is_err(),
                "byte {i} flipped but token still verified"
            );
        }
    }

    #[test]
    fn test_other_hmac_variant_accepted() {
        let claims = Claims::new("user123", NOW, 3600).unwrap();
        let token = HmacSigner::new(Algorithm::HS512)
            .unwrap()
            .sign(&claims, SECRET)
            .unwrap();

        assert_eq!(HmacSigner::default().verify(&token, SECRET).unwrap(), claims);
    }

    #[test]
    fn test_algorithm_substitution() {
        // {"alg":"none","typ":"JWT"}
        let header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        let payload = token().split('.').nth(1).unwrap().to_owned();
        let forged = format!("{header}.{payload}.");

        assert!(HmacSigner::default().verify(&forged, SECRET).is_err());

        // {"alg":"RS256","typ":"JWT"}
        let header = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9";
        let forged = format!("{header}.{payload}.c2lnbmF0dXJl");

        assert!(matches!(
            HmacSigner::default().verify(&forged, SECRET),
            Err(VerificationError::UnsupportedAlgorithm(Algorithm::RS256))
        ));
    }

    #[test]
    fn test_signer_rejects_asymmetric_algorithm() {
        assert!(HmacSigner::new(Algorithm::ES256).is_err());
        assert_eq!(
            HmacSigner::new(Algorithm::HS384).unwrap().algorithm(),
            Algorithm::HS384
        );
    }

    #[test]
    fn test_garbage() {
        for token in ["", "abc", "a.b.c", "...."] {
            assert!(matches!(
                HmacSigner::default().verify(token, SECRET),
                Err(VerificationError::Malformed(_))
            ));
        }
    }
}
