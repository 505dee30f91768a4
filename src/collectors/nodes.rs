use crate::collectors::CollectError;
use crate::snapshot::NodesStats;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const STATS_PATH: &str = "_nodes/stats/fs,jvm,process";
const MAX_ERROR_BODY: usize = 512;

pub fn build_client(timeout: Duration) -> Result<Client, CollectError> {
    Client::builder()
        .user_agent(concat!("healthcheck/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(CollectError::Client)
}

pub fn stats_url(endpoint: &str) -> String {
    format!("{}/{STATS_PATH}", endpoint.trim_end_matches('/'))
}

pub async fn fetch_node_stats(
    client: &Client,
    endpoint: &str,
    token: Option<&str>,
) -> Result<NodesStats, CollectError> {
    let url = stats_url(endpoint);
    let start = Instant::now();

    let mut req = client.get(&url);
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }

    let resp = req.send().await.map_err(|source| CollectError::Request {
        url: url.clone(),
        source,
    })?;
    let status = resp.status();
    let body = resp.text().await.map_err(|source| CollectError::Request {
        url: url.clone(),
        source,
    })?;

    if !status.is_success() {
        warn!(url = %url, status = status.as_u16(), "статистика узлов недоступна");
        return Err(CollectError::Upstream {
            url,
            status: status.as_u16(),
            body: truncate(&body, MAX_ERROR_BODY),
        });
    }

    debug!(
        url = %url,
        latency_ms = start.elapsed().as_millis() as u64,
        bytes = body.len(),
        "статистика узлов получена"
    );
    serde_json::from_str(&body).map_err(|source| CollectError::Parse { url, source })
}

fn truncate(body: &str, max: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::{routing::get, Router};
    use tokio::net::TcpListener;

    const BODY: &str = r#"{"nodes": {"n1": {
        "name": "es-data-1",
        "fs": {"total": {"total_in_bytes": 104857600, "available_in_bytes": 31457280}},
        "jvm": {
            "mem": {"heap_max_in_bytes": 1048576, "heap_used_in_bytes": 524288, "non_heap_used_in_bytes": 0},
            "gc": {"collectors": {}},
            "uptime_in_millis": 1000
        },
        "process": {"cpu": {"percent": 3}}
    }}}"#;

    async fn stats(headers: HeaderMap) -> impl IntoResponse {
        match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some("Bearer secret") => (StatusCode::OK, BODY),
            _ => (StatusCode::UNAUTHORIZED, "missing token"),
        }
    }

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("привязка тестового сокета");
        let addr = listener.local_addr().expect("адрес тестового сервера");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/")
    }

    fn client() -> Client {
        build_client(Duration::from_secs(5)).expect("HTTP-клиент должен собираться")
    }

    #[test]
    fn url_trims_trailing_slash() {
        assert_eq!(
            stats_url("https://es.local:9200/"),
            "https://es.local:9200/_nodes/stats/fs,jvm,process"
        );
        assert_eq!(
            stats_url("https://es.local:9200"),
            "https://es.local:9200/_nodes/stats/fs,jvm,process"
        );
    }

    #[tokio::test]
    async fn fetches_with_bearer_token() {
        let endpoint = serve(Router::new().route("/_nodes/stats/fs,jvm,process", get(stats))).await;
        let stats = fetch_node_stats(&client(), &endpoint, Some("secret"))
            .await
            .expect("запрос должен пройти");
        assert_eq!(stats.nodes.len(), 1);
        assert_eq!(stats.nodes["n1"].name, "es-data-1");
    }

    #[tokio::test]
    async fn non_success_is_upstream_error() {
        let endpoint = serve(Router::new().route("/_nodes/stats/fs,jvm,process", get(stats))).await;
        let err = fetch_node_stats(&client(), &endpoint, None)
            .await
            .expect_err("без токена должна быть ошибка");
        match err {
            CollectError::Upstream { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, "missing token");
            }
            other => panic!("неожиданная ошибка: {other}"),
        }
    }

    #[tokio::test]
    async fn client_timeout_is_enforced() {
        let app = Router::new().route(
            "/_nodes/stats/fs,jvm,process",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                BODY
            }),
        );
        let endpoint = serve(app).await;
        let client = build_client(Duration::from_millis(200)).expect("HTTP-клиент");
        let err = fetch_node_stats(&client, &endpoint, None)
            .await
            .expect_err("ответ медленнее таймаута");
        match err {
            CollectError::Request { source, .. } => assert!(source.is_timeout()),
            other => panic!("неожиданная ошибка: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let app = Router::new().route(
            "/_nodes/stats/fs,jvm,process",
            get(|| async { r#"{"nodes": {"n1": {"name": "x"}}}"# }),
        );
        let endpoint = serve(app).await;
        let err = fetch_node_stats(&client(), &endpoint, None)
            .await
            .expect_err("неполный снимок должен отклоняться");
        assert!(matches!(err, CollectError::Parse { .. }));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(600);
        let out = truncate(&body, 512);
        assert_eq!(out.len(), 515);
        assert!(out.ends_with("..."));
    }
}
