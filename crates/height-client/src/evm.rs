use crate::{
    FetchError,
    HeightSource,
    ResultPath,
    ensure_success,
    http_client,
    parse_height,
};
use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use tracing::debug;
use url::Url;

pub const DEFAULT_EVM_METHOD: &str = "eth_blockNumber";
pub const DEFAULT_RESULT_PATH: &str = "result";

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<Value>,
}

/// JSON-RPC error structure
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Reads the block number from an EVM-style JSON-RPC node.
///
/// The method name and the location of the height in the response are
/// configurable, so chains like Harmony (`hmyv2_blockNumber`) work too.
#[derive(Debug, Clone)]
pub struct EvmClient {
    client: Client,
    method: String,
    result_path: ResultPath,
}

impl EvmClient {
    pub fn new(method: &str, result_path: &str) -> Result<Self, FetchError> {
        let result_path = result_path.parse().map_err(FetchError::Malformed)?;
        Ok(Self {
            client: http_client()?,
            method: method.to_owned(),
            result_path,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl HeightSource for EvmClient {
    async fn fetch_height(&self, endpoint: &str) -> Result<u64, FetchError> {
        let url = Url::parse(endpoint)?;
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: &self.method,
            params: Vec::new(),
        };

        let response = self.client.post(url).json(&request).send().await?;
        ensure_success(&response)?;
        let body: Value = response.json().await?;

        debug!(endpoint, method = %self.method, ?body, "Response from EVM RPC");

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let error: JsonRpcError = serde_json::from_value(error.clone())
                .map_err(|e| FetchError::Malformed(format!("error object: {e}")))?;
            return Err(FetchError::JsonRpc {
                code: error.code,
                message: error.message,
            });
        }

        let value = self.result_path.lookup(&body).ok_or_else(|| {
            FetchError::Malformed(format!("no value at path `{}`", self.result_path))
        })?;
        parse_height(value)
    }
}
