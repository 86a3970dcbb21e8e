/// Token Service
///
/// Ties the issuer, generator, store and verifier together into the two
/// flows exposed to clients: issuing a token pair and refreshing an access
/// token.

use std::sync::Arc;

use serde::Serialize;

use crate::auth::access_token::{AccessToken, AccessTokenIssuer};
use crate::auth::refresh_token::RefreshTokenGenerator;
use crate::auth::rotation::{IpChangeListener, RefreshTokenStore, RefreshTokenVerifier};
use crate::configuration::{JwtSettings, RefreshTokenSettings};
use crate::error::{AppError, AuthError};
use crate::store::RefreshTokenRepository;

/// Access and refresh token handed out on issuance
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenService {
    issuer: Arc<AccessTokenIssuer>,
    generator: RefreshTokenGenerator,
    store: RefreshTokenStore,
    verifier: RefreshTokenVerifier,
}

impl TokenService {
    pub fn new(
        jwt: &JwtSettings,
        refresh: &RefreshTokenSettings,
        repository: Arc<dyn RefreshTokenRepository>,
    ) -> Self {
        Self {
            issuer: Arc::new(AccessTokenIssuer::new(jwt)),
            generator: RefreshTokenGenerator::new(),
            store: RefreshTokenStore::new(
                repository.clone(),
                refresh.hash_cost,
                refresh.single_active_token,
            ),
            verifier: RefreshTokenVerifier::new(repository),
        }
    }

    pub fn with_ip_change_listener(mut self, listener: Arc<dyn IpChangeListener>) -> Self {
        self.verifier = self.verifier.with_listener(listener);
        self
    }

    pub fn issuer(&self) -> &AccessTokenIssuer {
        &self.issuer
    }

    /// Issue an access token and a stored, single-use refresh token
    pub async fn issue_pair(&self, user_id: &str, client_ip: &str) -> Result<TokenPair, AppError> {
        let access_token = self.issuer.issue(user_id, client_ip)?;
        let refresh_token = self.generator.generate()?;

        self.store
            .persist(user_id, refresh_token.expose(), client_ip)
            .await?;

        Ok(TokenPair {
            access_token: access_token.token,
            refresh_token: refresh_token.into_inner(),
        })
    }

    /// Consume `presented_token` and mint a new access token
    ///
    /// # Errors
    /// Any rejection of the refresh token surfaces as `AppError::Auth`
    pub async fn refresh(
        &self,
        user_id: &str,
        presented_token: &str,
        client_ip: &str,
    ) -> Result<AccessToken, AppError> {
        let valid = self
            .verifier
            .verify_and_rotate(user_id, presented_token, client_ip)
            .await?;
        if !valid {
            return Err(AuthError::InvalidToken.into());
        }

        self.issuer.issue(user_id, client_ip)
    }

    /// Delete refresh token records older than `max_age`
    pub async fn purge_stale(&self, max_age: chrono::Duration) -> Result<u64, AppError> {
        self.store.purge_stale(max_age).await
    }
}
