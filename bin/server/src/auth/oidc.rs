//! OpenID Connect strategy using the openidconnect crate.

use async_trait::async_trait;
use gatehouse_access::{
    AuthenticatedUser, Authorization, PendingAuthorization, ProviderConfig, Strategy,
    StrategyError,
};
use openidconnect::core::{CoreAuthenticationFlow, CoreClient, CoreProviderMetadata};
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl, Nonce, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
};

/// Scopes requested on every login.
const SCOPES: [&str; 2] = ["email", "profile"];

/// Strategy that authenticates against an OIDC provider with the
/// authorization-code flow, PKCE and a nonce.
pub struct OidcStrategy {
    provider_metadata: CoreProviderMetadata,
    client_id: ClientId,
    client_secret: Option<ClientSecret>,
    redirect_url: RedirectUrl,
    http_client: reqwest::Client,
}

impl OidcStrategy {
    /// Creates a strategy by discovering the provider metadata.
    ///
    /// The issuer is `https://{domain}/` unless the domain already carries a
    /// scheme. The redirect URI is `public_url` joined with the callback path.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain or client id is missing, a URL is
    /// malformed, or discovery fails.
    pub async fn discover(
        provider: &ProviderConfig,
        public_url: &str,
    ) -> Result<Self, StrategyError> {
        let domain = provider
            .domain
            .as_deref()
            .ok_or_else(|| StrategyError::Configuration {
                details: "provider domain is not set".to_string(),
            })?;
        let client_id = provider
            .client_id
            .clone()
            .ok_or_else(|| StrategyError::Configuration {
                details: "provider client id is not set".to_string(),
            })?;

        let issuer_url = IssuerUrl::new(issuer_for(domain)).map_err(|e| {
            StrategyError::Configuration {
                details: format!("invalid issuer URL: {}", e),
            }
        })?;

        let redirect_url = RedirectUrl::new(redirect_uri_for(public_url, &provider.callback_path))
            .map_err(|e| StrategyError::Configuration {
                details: format!("invalid redirect URI: {}", e),
            })?;

        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| StrategyError::Configuration {
                details: format!("failed to create HTTP client: {}", e),
            })?;

        let provider_metadata = CoreProviderMetadata::discover_async(issuer_url, &http_client)
            .await
            .map_err(|e| StrategyError::Discovery {
                details: format!("failed to discover provider: {}", e),
            })?;

        Ok(Self {
            provider_metadata,
            client_id: ClientId::new(client_id),
            client_secret: provider.client_secret.clone().map(ClientSecret::new),
            redirect_url,
            http_client,
        })
    }
}

#[async_trait]
impl Strategy for OidcStrategy {
    fn begin(&self) -> Result<Authorization, StrategyError> {
        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            self.client_secret.clone(),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_pkce_challenge(pkce_challenge);

        for scope in SCOPES {
            auth_request = auth_request.add_scope(Scope::new(scope.to_string()));
        }

        let (auth_url, csrf_token, nonce) = auth_request.url();

        Ok(Authorization {
            url: auth_url.to_string(),
            pending: PendingAuthorization {
                csrf_token: csrf_token.secret().clone(),
                pkce_verifier: pkce_verifier.secret().clone(),
                nonce: nonce.secret().clone(),
            },
        })
    }

    async fn exchange(
        &self,
        code: &str,
        pending: &PendingAuthorization,
    ) -> Result<AuthenticatedUser, StrategyError> {
        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            self.client_secret.clone(),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let token_request = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| StrategyError::TokenExchange {
                details: format!("token endpoint error: {}", e),
            })?;

        let token_response = token_request
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| StrategyError::TokenExchange {
                details: format!("token exchange failed: {}", e),
            })?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| StrategyError::TokenValidation {
                details: "no ID token in response".to_string(),
            })?;

        let nonce = Nonce::new(pending.nonce.clone());
        let claims = id_token
            .claims(&client.id_token_verifier(), &nonce)
            .map_err(|e| StrategyError::TokenValidation {
                details: format!("ID token validation failed: {}", e),
            })?;

        // The profile is the full claim set; the gate does not interpret it.
        let profile = serde_json::to_value(claims).map_err(|e| StrategyError::TokenValidation {
            details: format!("failed to encode claims: {}", e),
        })?;

        tracing::debug!(subject = %claims.subject().as_str(), "credential exchange succeeded");

        Ok(AuthenticatedUser::from_value(profile))
    }
}

fn issuer_for(domain: &str) -> String {
    if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{}/", domain.trim_end_matches('/'))
    }
}

fn redirect_uri_for(public_url: &str, callback_path: &str) -> String {
    format!("{}{}", public_url.trim_end_matches('/'), callback_path)
}
