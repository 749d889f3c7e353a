//! Identity providers
//!
//! Every provider the service knows about is a [`ProviderKind`]. At start
//! the configured credentials decide which of them end up in the
//! [`ProviderSet`]; a provider with a missing id or secret is skipped.

use serde::Deserialize;

use super::claims::Principal;
use crate::config::{ProviderEndpoints, ProvidersConfig};
use crate::error::AppError;

/// Statically known identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    GitHub,
}

impl ProviderKind {
    /// All provider kinds, in display order.
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Google, ProviderKind::GitHub];

    /// URL path segment and cookie-safe identifier
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::GitHub => "github",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Google => "Google",
            ProviderKind::GitHub => "GitHub",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn authorize_url(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            ProviderKind::GitHub => "https://github.com/login/oauth/authorize",
        }
    }

    pub fn token_url(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://oauth2.googleapis.com/token",
            ProviderKind::GitHub => "https://github.com/login/oauth/access_token",
        }
    }

    pub fn userinfo_url(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://openidconnect.googleapis.com/v1/userinfo",
            ProviderKind::GitHub => "https://api.github.com/user",
        }
    }

    /// Verified address list, consulted when the profile hides the email.
    pub fn emails_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Google => None,
            ProviderKind::GitHub => Some("https://api.github.com/user/emails"),
        }
    }

    pub fn scope(&self) -> &'static str {
        match self {
            ProviderKind::Google => "openid email profile",
            ProviderKind::GitHub => "read:user user:email",
        }
    }

    /// Map a userinfo response body to a [`Principal`].
    pub fn parse_profile(&self, body: serde_json::Value) -> Result<Principal, AppError> {
        match self {
            ProviderKind::Google => {
                let profile: GoogleProfile = serde_json::from_value(body)
                    .map_err(|e| AppError::Provider(format!("google profile: {e}")))?;
                Ok(Principal {
                    id: profile.sub,
                    name: profile.name,
                    email: profile.email,
                    image: profile.picture,
                })
            }
            ProviderKind::GitHub => {
                let profile: GitHubProfile = serde_json::from_value(body)
                    .map_err(|e| AppError::Provider(format!("github profile: {e}")))?;
                Ok(Principal {
                    id: profile.id.to_string(),
                    name: profile.name.or(Some(profile.login)),
                    email: profile.email,
                    image: profile.avatar_url,
                })
            }
        }
    }
}

/// Google OpenID Connect userinfo
#[derive(Debug, Deserialize)]
struct GoogleProfile {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

/// GitHub user info
#[derive(Debug, Deserialize)]
struct GitHubProfile {
    login: String,
    id: u64,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

/// One entry of GitHub's `/user/emails` response
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// The primary address, provided it has been verified.
pub fn primary_verified_email(emails: &[ProviderEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email.clone())
}

/// A provider with usable client credentials and resolved endpoints.
#[derive(Debug, Clone)]
pub struct Provider {
    pub kind: ProviderKind,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub emails_url: Option<String>,
}

impl Provider {
    /// Provider using the kind's public endpoints.
    pub fn new(
        kind: ProviderKind,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: kind.authorize_url().to_string(),
            token_url: kind.token_url().to_string(),
            userinfo_url: kind.userinfo_url().to_string(),
            emails_url: kind.emails_url().map(str::to_string),
        }
    }

    /// Replace any endpoint that has an override configured.
    pub fn with_endpoints(mut self, endpoints: &ProviderEndpoints) -> Self {
        if let Some(url) = &endpoints.authorize_url {
            self.authorize_url = url.clone();
        }
        if let Some(url) = &endpoints.token_url {
            self.token_url = url.clone();
        }
        if let Some(url) = &endpoints.userinfo_url {
            self.userinfo_url = url.clone();
        }
        if let Some(url) = &endpoints.emails_url {
            self.emails_url = Some(url.clone());
        }
        self
    }
}

/// Enabled providers, in [`ProviderKind::ALL`] order.
#[derive(Debug, Clone, Default)]
pub struct ProviderSet {
    providers: Vec<Provider>,
}

impl ProviderSet {
    pub fn builder() -> ProviderSetBuilder {
        ProviderSetBuilder::default()
    }

    /// Enable every provider whose id and secret are both configured.
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let mut builder = Self::builder();
        for kind in ProviderKind::ALL {
            let credentials = match kind {
                ProviderKind::Google => &config.google,
                ProviderKind::GitHub => &config.github,
            };
            match credentials.pair() {
                Some((client_id, client_secret)) => {
                    builder = builder.with_provider(
                        Provider::new(kind, client_id, client_secret)
                            .with_endpoints(&credentials.endpoints),
                    );
                }
                None => tracing::info!(provider = kind.id(), "Provider disabled: no credentials"),
            }
        }
        builder.build()
    }

    /// Look up an enabled provider by its URL id.
    pub fn get(&self, id: &str) -> Option<&Provider> {
        let kind = ProviderKind::from_id(id)?;
        self.providers.iter().find(|p| p.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

#[derive(Debug, Default)]
pub struct ProviderSetBuilder {
    providers: Vec<Provider>,
}

impl ProviderSetBuilder {
    /// Append a provider on its default endpoints.
    pub fn with(
        self,
        kind: ProviderKind,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.with_provider(Provider::new(kind, client_id, client_secret))
    }

    /// Append a provider. A kind that is already present is replaced.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.providers.retain(|p| p.kind != provider.kind);
        self.providers.push(provider);
        self
    }

    pub fn build(mut self) -> ProviderSet {
        self.providers.sort_by_key(|p| {
            ProviderKind::ALL
                .iter()
                .position(|kind| *kind == p.kind)
                .unwrap_or(usize::MAX)
        });
        ProviderSet {
            providers: self.providers,
        }
    }
}
