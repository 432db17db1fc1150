use anyhow::{Result, anyhow};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = "stockval/0.1";

/// Builds the HTTP client shared by one provider.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?)
}

/// GETs `url` and decodes the JSON body, failing on transport errors and non-2xx statuses.
pub async fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T> {
    debug!("Requesting {}", url.path());

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url.path()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("HTTP error: {} for URL: {}", status, url.path()));
    }

    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", url.path(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Deserialize)]
    struct Payload {
        value: i32,
    }

    fn client() -> Client {
        build_client(USER_AGENT, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_json_decodes_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"value": 7}"#))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/data", mock_server.uri())).unwrap();
        let payload: Payload = get_json(&client(), url).await.unwrap();
        assert_eq!(payload.value, 7);
    }

    #[tokio::test]
    async fn test_get_json_rejects_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/data", mock_server.uri())).unwrap();
        let result: Result<Payload> = get_json(&client(), url).await;
        assert_eq!(
            result.err().unwrap().to_string(),
            "HTTP error: 503 Service Unavailable for URL: /data"
        );
    }

    #[tokio::test]
    async fn test_get_json_reports_malformed_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/data", mock_server.uri())).unwrap();
        let result: Result<Payload> = get_json(&client(), url).await;
        assert!(
            result
                .err()
                .unwrap()
                .to_string()
                .contains("Failed to parse JSON response for /data")
        );
    }
}
