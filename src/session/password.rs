//! Password Grant Session
//!
//! Authenticate, refresh and revoke against the token endpoint using the
//! resource owner password credentials grant.

use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::{HttpRequest, HttpTransport, ReqwestHttpTransport};
use crate::error::{
    create_error_from_response, AuthenticationError, SessionError, SessionResult,
};
use crate::resources::{HttpResourceDirectory, ResourceDirectory};
use crate::session::SessionState;
use crate::storage::{InMemoryStorage, StorageBackend};
use crate::token::TokenCache;
use crate::types::{ResourceMap, SessionConfig, SessionOptions, TokenBundle, TokenResponse};

/// Session with the default reqwest transport and in-memory storage.
pub type DefaultAuthSession = AuthSession<
    ReqwestHttpTransport,
    InMemoryStorage,
    HttpResourceDirectory<ReqwestHttpTransport>,
>;

/// Token lifecycle for one credential set and one storage namespace.
///
/// Operations take `&mut self`; callers sharing a session across tasks must
/// serialize access themselves.
pub struct AuthSession<T: HttpTransport, S: StorageBackend, R: ResourceDirectory> {
    config: SessionConfig,
    options: SessionOptions,
    transport: Arc<T>,
    cache: TokenCache<S>,
    directory: Arc<R>,
    state: SessionState,
}

impl DefaultAuthSession {
    /// Create a session with default collaborators.
    pub fn with_defaults(config: SessionConfig, options: SessionOptions) -> SessionResult<Self> {
        let transport = Arc::new(ReqwestHttpTransport::new()?);
        let storage = Arc::new(InMemoryStorage::new(config.storage()));
        let directory = Arc::new(
            HttpResourceDirectory::new(transport.clone(), options.api_version.clone())
                .with_timeout(options.timeout),
        );

        Ok(Self::with_options(
            config, options, transport, storage, directory,
        ))
    }
}

impl<T: HttpTransport, S: StorageBackend, R: ResourceDirectory> AuthSession<T, S, R> {
    /// Create a session with default options.
    pub fn new(
        config: SessionConfig,
        transport: Arc<T>,
        storage: Arc<S>,
        directory: Arc<R>,
    ) -> Self {
        Self::with_options(
            config,
            SessionOptions::default(),
            transport,
            storage,
            directory,
        )
    }

    /// Create a session with custom options.
    pub fn with_options(
        config: SessionConfig,
        options: SessionOptions,
        transport: Arc<T>,
        storage: Arc<S>,
        directory: Arc<R>,
    ) -> Self {
        let cipher = config.token_cipher();
        Self {
            config,
            options,
            transport,
            cache: TokenCache::new(storage, cipher),
            directory,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn cache(&self) -> &TokenCache<S> {
        &self.cache
    }

    /// Obtain a token bundle, persist it, then discover and persist resources.
    pub async fn authenticate(&mut self) -> SessionResult<TokenBundle> {
        info!(
            login_url = %self.config.login_url,
            username = %self.config.username,
            "Authenticating with password grant"
        );

        let bundle = self.request_token().await?;
        self.cache.put_token_data(&bundle).await?;

        let resources = self.directory.fetch_resources(&bundle).await?;
        self.cache.store_resources(&resources).await?;

        self.transition(SessionState::Authenticated);
        Ok(bundle)
    }

    /// Re-submit the credentials for a fresh token; resources are not re-fetched.
    ///
    /// The password grant issues no refresh token, so this repeats the
    /// authenticate request.
    pub async fn refresh(&mut self) -> SessionResult<TokenBundle> {
        info!(login_url = %self.config.login_url, "Refreshing token");

        let bundle = self.request_token().await?;
        self.cache.put_token_data(&bundle).await?;

        self.transition(SessionState::Authenticated);
        Ok(bundle)
    }

    /// Revoke the stored access token at the remote server.
    ///
    /// The token stays in storage; use [`TokenCache::forget_token`] to drop
    /// it locally. A missing token fails with `MissingKey` and leaves the
    /// state unchanged.
    pub async fn revoke(&mut self) -> SessionResult<()> {
        let bundle = self.cache.get_token_data().await?;

        let request = HttpRequest::form_post(
            self.config.revoke_url(),
            [("token", bundle.access_token.as_str())],
        )
        .with_timeout(self.options.timeout);

        debug!(url = %request.url, "Revoking access token");
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            warn!(status = response.status, "Token revocation rejected");
            return Err(create_error_from_response(response.status, &response.body));
        }

        info!("Access token revoked");
        self.transition(SessionState::Revoked);
        Ok(())
    }

    /// Current token bundle. A cache miss drops an authenticated session back
    /// to `Unauthenticated` before the error propagates.
    pub async fn token_data(&mut self) -> SessionResult<TokenBundle> {
        match self.cache.get_token_data().await {
            Ok(bundle) => Ok(bundle),
            Err(e) if e.is_missing_key() => {
                if self.state.is_authenticated() {
                    self.transition(SessionState::Unauthenticated);
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Cached resource map.
    pub async fn resources(&self) -> SessionResult<ResourceMap> {
        self.cache.get_resources().await
    }

    async fn request_token(&self) -> SessionResult<TokenBundle> {
        let request = HttpRequest::form_post(
            self.config.token_url(),
            self.config.password_grant_params(),
        )
        .with_timeout(self.options.timeout);

        debug!(url = %request.url, "Requesting token");
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            warn!(status = response.status, "Token request rejected");
            return Err(create_error_from_response(response.status, &response.body));
        }

        let token_response: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            SessionError::Authentication(AuthenticationError::MalformedResponse {
                message: e.to_string(),
            })
        })?;

        let bundle = TokenBundle::from_response(token_response)?;

        if self.options.verify_signature
            && !bundle.verify_signature(self.config.consumer_secret.expose_secret())
        {
            warn!(id = %bundle.id, "Token signature mismatch");
            return Err(SessionError::Authentication(
                AuthenticationError::InvalidSignature,
            ));
        }

        Ok(bundle)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Session state changed");
        }
        self.state = next;
    }
}
