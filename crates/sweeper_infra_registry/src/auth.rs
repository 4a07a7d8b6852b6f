use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use crate::error::RegistryError;

// Token servers may omit expires_in; the distribution spec says to assume 60s.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60);
const EXPIRY_MARGIN: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A parsed `WWW-Authenticate` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    Basic,
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
}

impl Challenge {
    pub fn parse(header: &str) -> Result<Self, RegistryError> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));

        if scheme.eq_ignore_ascii_case("basic") {
            return Ok(Self::Basic);
        }
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(RegistryError::InvalidChallenge(header.to_string()));
        }

        let mut params = parse_params(rest);
        let realm = params
            .remove("realm")
            .ok_or_else(|| RegistryError::InvalidChallenge(header.to_string()))?;

        Ok(Self::Bearer {
            realm,
            service: params.remove("service"),
            scope: params.remove("scope"),
        })
    }
}

/// Splits `key="value",key2=value2` honouring commas inside quotes.
fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
            chars.next();
        }

        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if key.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    c => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                value.push(*c);
                chars.next();
            }
        }

        params.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    params
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// How a request should be authorized once the registry has challenged it.
#[derive(Debug, Clone)]
pub enum Authorization {
    Basic(Credentials),
    Bearer(String),
}

impl Authorization {
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Basic(credentials) => request.basic_auth(&credentials.username, Some(&credentials.password)),
            Self::Bearer(token) => request.bearer_auth(token),
        }
    }
}

#[derive(Default)]
struct AuthState {
    // Resource -> challenge the registry last issued for it.
    challenges: HashMap<String, Challenge>,
    tokens: HashMap<String, CachedToken>, // Scope -> Token
    // Set once the registry has accepted basic credentials for anything.
    basic: bool,
}

/// Answers registry challenges and remembers them, so later requests for
/// the same resource carry credentials from the start.
///
/// A resource is whatever key the caller uses to group requests that get
/// the same challenge, e.g. `team/api:pull`.
pub struct Authenticator {
    client: Client,
    credentials: Option<Credentials>,
    state: Mutex<AuthState>,
}

impl Authenticator {
    pub fn new(client: Client, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            credentials,
            state: Mutex::new(AuthState::default()),
        }
    }

    /// Authorization to attach before the registry has asked for it.
    /// `None` means nothing is known yet and the request goes out bare.
    pub async fn preauthorize(&self, resource: &str) -> Result<Option<Authorization>, RegistryError> {
        let challenge = {
            let state = self.state.lock().await;
            match state.challenges.get(resource) {
                Some(challenge) => challenge.clone(),
                None if state.basic => Challenge::Basic,
                None => return Ok(None),
            }
        };

        self.authorize_challenge(&challenge).await.map(Some)
    }

    /// Answers `challenge` and remembers it for `resource`.
    pub async fn authorize(&self, resource: &str, challenge: &Challenge) -> Result<Authorization, RegistryError> {
        let authorization = self.authorize_challenge(challenge).await?;

        let mut state = self.state.lock().await;
        if *challenge == Challenge::Basic {
            state.basic = true;
        }
        state.challenges.insert(resource.to_string(), challenge.clone());
        Ok(authorization)
    }

    /// Forgets what the registry refused for `resource`.
    pub async fn invalidate(&self, resource: &str, challenge: &Challenge) {
        let mut state = self.state.lock().await;
        state.challenges.remove(resource);
        match challenge {
            Challenge::Basic => state.basic = false,
            Challenge::Bearer { scope, .. } => {
                state.tokens.remove(scope.as_deref().unwrap_or_default());
            }
        }
    }

    async fn authorize_challenge(&self, challenge: &Challenge) -> Result<Authorization, RegistryError> {
        match challenge {
            Challenge::Basic => self
                .credentials
                .clone()
                .map(Authorization::Basic)
                .ok_or_else(|| RegistryError::AuthenticationFailed("registry requires credentials".to_string())),
            Challenge::Bearer { realm, service, scope } => {
                let token = self.get_token(realm, service.as_deref(), scope.as_deref()).await?;
                Ok(Authorization::Bearer(token))
            }
        }
    }

    // The lock is not held during the fetch; two callers missing the cache
    // for one scope may both fetch, and the later insert wins.
    async fn get_token(&self, realm: &str, service: Option<&str>, scope: Option<&str>) -> Result<String, RegistryError> {
        let key = scope.unwrap_or_default();
        {
            let state = self.state.lock().await;
            if let Some(cached) = state.tokens.get(key) {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut query = Vec::new();
        if let Some(service) = service {
            query.push(("service", service));
        }
        if let Some(scope) = scope {
            query.push(("scope", scope));
        }

        let mut request = self.client.get(realm).query(&query);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(RegistryError::AuthenticationFailed(format!("Status: {}", resp.status())));
        }

        let token_resp: TokenResponse = resp.json().await?;
        let token = token_resp
            .token
            .or(token_resp.access_token)
            .ok_or_else(|| RegistryError::AuthenticationFailed("token response carried no token".to_string()))?;

        let lifetime = token_resp
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let expires_at = Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN);

        tracing::debug!(scope = key, lifetime_secs = lifetime.as_secs(), "Fetched registry token");
        self.state
            .lock()
            .await
            .tokens
            .insert(key.to_string(), CachedToken { token: token.clone(), expires_at });
        Ok(token)
    }
}
