use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, SubsecRound, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Clock skew tolerated on `exp` and `nbf`.
    pub leeway: Duration,
    pub signing_key: Vec<u8>,
}

pub struct JwtHs256Codec {
    issuer: String,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn try_new(cfg: JwtConfig) -> Result<Self, SessionError> {
        if cfg.signing_key.is_empty() {
            return Err(SessionError::Internal("empty signing key".to_string()));
        }
        if cfg.access_ttl.is_zero() {
            return Err(SessionError::Internal("access ttl must be positive".to_string()));
        }
        if cfg.access_ttl >= cfg.refresh_ttl {
            return Err(SessionError::Internal(format!(
                "access ttl {:?} must be shorter than refresh ttl {:?}",
                cfg.access_ttl, cfg.refresh_ttl
            )));
        }

        let access_ttl = chrono::Duration::from_std(cfg.access_ttl)
            .map_err(|e| SessionError::Internal(e.to_string()))?;
        let refresh_ttl = chrono::Duration::from_std(cfg.refresh_ttl)
            .map_err(|e| SessionError::Internal(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = cfg.leeway.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_issuer(&[cfg.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        Ok(JwtHs256Codec {
            issuer: cfg.issuer,
            access_ttl,
            refresh_ttl,
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            validation,
        })
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn encode_claims(
        &self,
        user_id: UserId,
        email: Option<&str>,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<(String, DateTime<Utc>), SessionError> {
        let exp_dt = issued_at + ttl;
        let claims = TokenClaims {
            user_id,
            email: email.map(str::to_owned),
            token_type,
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: exp_dt.timestamp(),
            jti: Self::gen_jti(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Internal(e.to_string()))?;
        Ok((token, exp_dt))
    }
}

fn fault_of(kind: &ErrorKind) -> TokenFault {
    match kind {
        ErrorKind::ExpiredSignature => TokenFault::Expired,
        ErrorKind::ImmatureSignature => TokenFault::NotYetValid,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenFault::BadSignature,
        _ => TokenFault::Malformed,
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn generate_token_pair(
        &self,
        user_id: UserId,
        email: Option<&str>,
    ) -> Result<TokenPair, SessionError> {
        // whole seconds, so the persisted expiries equal the signed `exp`
        let issued_at = Utc::now().trunc_subsecs(0);
        let (access, access_exp) =
            self.encode_claims(user_id, email, TokenType::Access, issued_at, self.access_ttl)?;
        let (refresh, refresh_exp) = self.encode_claims(
            user_id,
            email,
            TokenType::Refresh,
            issued_at,
            self.refresh_ttl,
        )?;

        Ok(TokenPair {
            access_token: AccessToken(access),
            refresh_token: RefreshToken(refresh),
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    async fn validate_token(&self, token: &str) -> Result<TokenClaims, SessionError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| SessionError::TokenInvalid(fault_of(e.kind())))?;
        let claims = data.claims;
        if claims.sub != claims.user_id.to_string() {
            return Err(SessionError::TokenInvalid(TokenFault::Malformed));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test-signing-key";

    fn config() -> JwtConfig {
        JwtConfig {
            issuer: "cadence.test".to_string(),
            access_ttl: Duration::from_secs(60 * 60),
            refresh_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            leeway: Duration::ZERO,
            signing_key: KEY.to_vec(),
        }
    }

    fn codec() -> JwtHs256Codec {
        JwtHs256Codec::try_new(config()).unwrap()
    }

    fn forge(claims: &TokenClaims, key: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(key),
        )
        .unwrap()
    }

    fn claims_at(iat: i64, exp: i64, token_type: TokenType) -> TokenClaims {
        TokenClaims {
            user_id: UserId(42),
            email: None,
            token_type,
            iss: "cadence.test".to_string(),
            sub: "42".to_string(),
            iat,
            nbf: iat,
            exp,
            jti: "jti".to_string(),
        }
    }

    #[tokio::test]
    async fn pair_has_expected_ttls_and_claims() {
        let codec = codec();
        let pair = codec.generate_token_pair(UserId(42), Some("a@b.c")).await.unwrap();

        let ttl = pair.refresh_token_expires_at - pair.access_token_expires_at;
        assert_eq!(ttl, chrono::Duration::days(30) - chrono::Duration::hours(1));
        assert!(pair.access_token_expires_at < pair.refresh_token_expires_at);
        assert_ne!(pair.access_token.0, pair.refresh_token.0);

        let claims = codec.validate_access_token(&pair.access_token.0).await.unwrap();
        assert_eq!(claims.user_id, UserId(42));
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iss, "cadence.test");
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp, pair.access_token_expires_at.timestamp());
        assert_eq!(claims.email.as_deref(), Some("a@b.c"));

        let claims = codec.validate_refresh_token(&pair.refresh_token.0).await.unwrap();
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.exp, pair.refresh_token_expires_at.timestamp());
    }

    #[tokio::test]
    async fn pairs_minted_back_to_back_differ() {
        let codec = codec();
        let a = codec.generate_token_pair(UserId(1), None).await.unwrap();
        let b = codec.generate_token_pair(UserId(1), None).await.unwrap();
        assert_ne!(a.access_token, b.access_token);
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[tokio::test]
    async fn tokens_differ_within_the_indexed_prefix() {
        let codec = codec();
        let email = format!("{}@department.example.com", "firstname.lastname".repeat(8));
        let a = codec.generate_token_pair(UserId(42), Some(&email)).await.unwrap();
        let b = codec.generate_token_pair(UserId(42), Some(&email)).await.unwrap();

        assert!(a.access_token.0.len() > 255);
        assert_ne!(a.access_token.0[..255], b.access_token.0[..255]);
        assert_ne!(a.refresh_token.0[..255], b.refresh_token.0[..255]);
    }

    #[tokio::test]
    async fn token_types_are_not_interchangeable() {
        let codec = codec();
        let pair = codec.generate_token_pair(UserId(42), None).await.unwrap();

        let err = codec
            .validate_refresh_token(&pair.access_token.0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::WrongTokenType {
                expected: TokenType::Refresh,
                found: TokenType::Access
            }
        ));

        let err = codec
            .validate_access_token(&pair.refresh_token.0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::WrongTokenType {
                expected: TokenType::Access,
                found: TokenType::Refresh
            }
        ));
    }

    #[tokio::test]
    async fn tampered_and_foreign_tokens_are_rejected() {
        let codec = codec();
        let pair = codec.generate_token_pair(UserId(42), None).await.unwrap();

        // access payload under the refresh token's signature
        let (signed_part, _) = pair.access_token.0.rsplit_once('.').unwrap();
        let (_, other_sig) = pair.refresh_token.0.rsplit_once('.').unwrap();
        let tampered = format!("{signed_part}.{other_sig}");
        let err = codec.validate_token(&tampered).await.unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid(TokenFault::BadSignature)));

        let now = Utc::now().timestamp();
        let foreign = forge(&claims_at(now, now + 600, TokenType::Access), b"other-key");
        let err = codec.validate_token(&foreign).await.unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid(TokenFault::BadSignature)));

        let err = codec.validate_token("not.a.token").await.unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid(TokenFault::Malformed)));
    }

    #[tokio::test]
    async fn expired_and_immature_tokens_are_rejected() {
        let codec = codec();
        let now = Utc::now().timestamp();

        let expired = forge(&claims_at(now - 7200, now - 3600, TokenType::Access), KEY);
        let err = codec.validate_token(&expired).await.unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid(TokenFault::Expired)));

        let immature = forge(&claims_at(now + 3600, now + 7200, TokenType::Access), KEY);
        let err = codec.validate_token(&immature).await.unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid(TokenFault::NotYetValid)));
    }

    #[tokio::test]
    async fn foreign_issuer_and_subject_mismatch_are_malformed() {
        let codec = codec();
        let now = Utc::now().timestamp();

        let mut claims = claims_at(now, now + 600, TokenType::Access);
        claims.iss = "someone.else".to_string();
        let err = codec.validate_token(&forge(&claims, KEY)).await.unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid(TokenFault::Malformed)));

        let mut claims = claims_at(now, now + 600, TokenType::Access);
        claims.sub = "43".to_string();
        let err = codec.validate_token(&forge(&claims, KEY)).await.unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid(TokenFault::Malformed)));
    }

    #[test]
    fn claims_serialize_with_wire_names() {
        let value = serde_json::to_value(claims_at(10, 20, TokenType::Refresh)).unwrap();
        assert_eq!(value["type"], "refresh");
        assert_eq!(value["user_id"], 42);
        assert_eq!(value["nbf"], 10);
        assert!(value.get("email").is_none());
    }

    #[test]
    fn rejects_access_ttl_not_shorter_than_refresh_ttl() {
        let mut cfg = config();
        cfg.access_ttl = cfg.refresh_ttl;
        assert!(matches!(
            JwtHs256Codec::try_new(cfg),
            Err(SessionError::Internal(_))
        ));

        let mut cfg = config();
        cfg.signing_key.clear();
        assert!(JwtHs256Codec::try_new(cfg).is_err());
    }
}
