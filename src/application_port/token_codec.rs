use crate::application_port::SessionError;
use crate::domain_model::{TokenClaims, TokenPair, TokenType, UserId};

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn generate_token_pair(
        &self,
        user_id: UserId,
        email: Option<&str>,
    ) -> Result<TokenPair, SessionError>;

    /// Checks algorithm, signature, issuer and time window. Does not look at the type.
    async fn validate_token(&self, token: &str) -> Result<TokenClaims, SessionError>;

    async fn validate_access_token(&self, token: &str) -> Result<TokenClaims, SessionError> {
        let claims = self.validate_token(token).await?;
        expect_type(claims, TokenType::Access)
    }

    async fn validate_refresh_token(&self, token: &str) -> Result<TokenClaims, SessionError> {
        let claims = self.validate_token(token).await?;
        expect_type(claims, TokenType::Refresh)
    }
}

fn expect_type(claims: TokenClaims, expected: TokenType) -> Result<TokenClaims, SessionError> {
    if claims.token_type != expected {
        return Err(SessionError::WrongTokenType {
            expected,
            found: claims.token_type,
        });
    }
    Ok(claims)
}
