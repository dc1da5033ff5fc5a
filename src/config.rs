use anyhow::{anyhow, Context, Result};
use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_TABLE: &str = "broadband_plans";
pub const DEFAULT_COLUMN: &str = "provider_name";

/// Connection settings for the hosted REST API, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub api_key: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Deserialize)]
struct KeyClaims {
    #[serde(rename = "ref")]
    project_ref: Option<String>,
}

impl Config {
    pub fn resolve(
        api_key: Option<String>,
        base_url: Option<String>,
        table: String,
        column: String,
    ) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("No API key given, set SUPABASE_SERVICE_ROLE_KEY or pass --api-key")
            })?;

        let base_url = match base_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => {
                Url::parse(&url).with_context(|| format!("Invalid base URL: {}", url))?
            }
            None => url_from_key(&api_key).context(
                "No base URL given and none could be derived from the API key, set SUPABASE_URL or pass --url",
            )?,
        };

        Ok(Self {
            base_url,
            api_key,
            table,
            column,
        })
    }

    /// `{base}/rest/v1/{table}`
    pub fn table_url(&self) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Base URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["rest", "v1", self.table.as_str()]);
        Ok(url)
    }
}

/// Derive `https://<ref>.supabase.co` from the `ref` claim of a JWT API key.
pub fn url_from_key(api_key: &str) -> Result<Url> {
    let payload = api_key
        .split('.')
        .nth(1)
        .context("API key is not a JWT")?;

    // some encoders pad anyway
    let decoded = BASE64_URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("API key payload is not valid base64")?;

    let claims: KeyClaims =
        serde_json::from_slice(&decoded).context("API key payload is not valid JSON")?;

    let project_ref = claims
        .project_ref
        .filter(|r| !r.is_empty())
        .context("API key has no `ref` claim")?;

    Url::parse(&format!("https://{}.supabase.co", project_ref))
        .with_context(|| format!("Invalid project ref: {}", project_ref))
}
