use crate::{
    FetchError,
    HeightSource,
    ensure_success,
    http_client,
    parse_height,
};
use reqwest::{
    Client,
    header,
};
use serde_json::{
    Value,
    json,
};
use tracing::debug;
use url::Url;

const HEIGHT_PATH: &str = "v1/query/height";

pub const DEFAULT_ORACLE_ENDPOINT: &str = "https://api.poktscan.com/poktscan/api/graphql";

const ORACLE_QUERY: &str = "query { highestBlock { item { height } } }";

/// Pocket node REST API: `POST {endpoint}/v1/query/height`.
#[derive(Debug, Clone)]
pub struct PocketClient {
    client: Client,
}

impl PocketClient {
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client()?,
        })
    }
}

/// Joins the height route onto the endpoint, keeping any base path it carries.
fn height_url(endpoint: &str) -> Result<Url, FetchError> {
    let base = Url::parse(endpoint)?;
    let joined = format!("{}/{HEIGHT_PATH}", base.as_str().trim_end_matches('/'));
    Ok(Url::parse(&joined)?)
}

impl HeightSource for PocketClient {
    async fn fetch_height(&self, endpoint: &str) -> Result<u64, FetchError> {
        let url = height_url(endpoint)?;
        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(&json!({}))
            .send()
            .await?;
        ensure_success(&response)?;
        let body: Value = response.json().await?;

        debug!(endpoint, ?body, "Response from Pocket RPC");

        let height = body
            .get("height")
            .ok_or_else(|| FetchError::Malformed("missing `height` field".into()))?;
        parse_height(height)
    }
}

/// Asks a GraphQL indexing service for the highest Pocket block instead of a
/// Pocket node.
#[derive(Clone)]
pub struct PocketOracleClient {
    client: Client,
    api_key: String,
}

impl std::fmt::Debug for PocketOracleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PocketOracleClient")
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl PocketOracleClient {
    pub fn new(api_key: &str) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.to_owned(),
        })
    }
}

impl HeightSource for PocketOracleClient {
    async fn fetch_height(&self, endpoint: &str) -> Result<u64, FetchError> {
        let url = Url::parse(endpoint)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "query": ORACLE_QUERY }))
            .send()
            .await?;
        ensure_success(&response)?;
        let body: Value = response.json().await?;

        debug!(endpoint, ?body, "Response from Pocket height oracle");

        if let Some(errors) = body
            .get("errors")
            .and_then(Value::as_array)
            .filter(|errors| !errors.is_empty())
        {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            return Err(FetchError::GraphQl(messages.join("; ")));
        }

        let height = body
            .pointer("/data/highestBlock/item/height")
            .ok_or_else(|| FetchError::Malformed("missing `highestBlock.item.height`".into()))?;
        parse_height(height)
    }
}
