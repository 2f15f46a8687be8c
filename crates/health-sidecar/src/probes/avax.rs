use super::ProbeVerdict;
use crate::error::ConfigError;
use height_client::FetchError;
use parking_lot::RwLock;
use reqwest::Client;
use serde_json::{
    Value,
    json,
};
use tracing::{
    debug,
    error,
    info,
};
use url::Url;

pub const DEFAULT_AVAX_HEALTH_ENDPOINT: &str = "http://127.0.0.1:9650/ext/health";

#[derive(Debug, Default)]
struct AvaxStatus {
    last_response_success: bool,
    last_response: Option<Value>,
}

/// Delegates the judgement to the node's own `health.health` endpoint.
#[derive(Debug)]
pub struct CustomAvax {
    client: Client,
    endpoint: Url,
    status: RwLock<AvaxStatus>,
}

impl CustomAvax {
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint).map_err(|source| {
            ConfigError::InvalidUrl {
                role: "avax health",
                url: endpoint.to_owned(),
                source,
            }
        })?;
        Ok(Self {
            client: height_client::http_client()?,
            endpoint,
            status: RwLock::new(AvaxStatus::default()),
        })
    }

    pub(super) fn init(&self) {
        info!(endpoint = %self.endpoint, "[customAvax]: strategy configured");
    }

    pub async fn background(&self) {
        match self.query().await {
            Ok(response) => {
                debug!(endpoint = %self.endpoint, ?response, "[customAvax]: response from Avax");
                let mut status = self.status.write();
                status.last_response_success = true;
                status.last_response = Some(response);
            }
            Err(err) => {
                error!(error = %err, "[customAvax]: Check failed");
                self.status.write().last_response_success = false;
            }
        }
    }

    async fn query(&self) -> Result<Value, FetchError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "health.health",
        });
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    pub fn verdict(&self) -> ProbeVerdict {
        let status = self.status.read();

        if !status.last_response_success {
            let msg = "Node does not respond successfully on health endpoint";
            error!("{msg}");
            return ProbeVerdict::unhealthy(msg);
        }

        let healthy = status
            .last_response
            .as_ref()
            .and_then(|response| response.pointer("/result/healthy"))
            .is_some_and(is_truthy);
        if !healthy {
            let msg = "Node is not healthy";
            error!("{msg}");
            return ProbeVerdict::unhealthy(msg);
        }

        ProbeVerdict::healthy("OK")
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use wiremock::{
        Mock,
        MockServer,
        ResponseTemplate,
        matchers::{
            body_partial_json,
            method,
            path,
        },
    };

    async fn avax(server: &MockServer) -> CustomAvax {
        CustomAvax::new(&format!("{}/ext/health", server.uri())).unwrap()
    }

    async fn respond(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/ext/health"))
            .and(body_partial_json(json!({ "method": "health.health" })))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fails_before_first_check() {
        let server = MockServer::start().await;
        let probe = avax(&server).await;
        let verdict = probe.verdict();
        assert_eq!(verdict.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(verdict.message, "Node does not respond successfully on health endpoint");
    }

    #[tokio::test]
    async fn healthy_node_passes() {
        let server = MockServer::start().await;
        respond(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "healthy": true, "checks": {} }
            })),
        )
        .await;

        let probe = avax(&server).await;
        probe.background().await;
        let verdict = probe.verdict();
        assert_eq!(verdict.status, StatusCode::OK);
        assert_eq!(verdict.message, "OK");
    }

    #[tokio::test]
    async fn unhealthy_node_fails() {
        let server = MockServer::start().await;
        respond(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "healthy": false }
            })),
        )
        .await;

        let probe = avax(&server).await;
        probe.background().await;
        let verdict = probe.verdict();
        assert_eq!(verdict.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(verdict.message, "Node is not healthy");
    }

    #[tokio::test]
    async fn missing_result_is_not_healthy() {
        let server = MockServer::start().await;
        respond(&server, ResponseTemplate::new(200).set_body_string("ok")).await;

        let probe = avax(&server).await;
        probe.background().await;
        assert_eq!(probe.verdict().message, "Node is not healthy");
    }

    #[tokio::test]
    async fn error_status_marks_endpoint_unresponsive() {
        let server = MockServer::start().await;
        respond(&server, ResponseTemplate::new(503)).await;

        let probe = avax(&server).await;
        probe.background().await;
        assert_eq!(
            probe.verdict().message,
            "Node does not respond successfully on health endpoint"
        );
    }

    #[test]
    fn rejects_invalid_endpoint() {
        assert!(matches!(
            CustomAvax::new("not a url"),
            Err(ConfigError::InvalidUrl { role: "avax health", .. })
        ));
    }

    #[test]
    fn truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(is_truthy(&json!({})));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }
}
