use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves `html` at `url_path` on `server`.
pub async fn mount_article(server: &MockServer, url_path: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html.to_string())
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Answers a MediaWiki `list=search` query for `keyword` with `titles`.
pub async fn mount_search(server: &MockServer, keyword: &str, titles: &[&str]) {
    let hits: Vec<serde_json::Value> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| serde_json::json!({"ns": 0, "title": title, "pageid": 1000 + i}))
        .collect();

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("action", "query"))
        .and(query_param("list", "search"))
        .and(query_param("srsearch", keyword))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "batchcomplete": "",
            "query": {"searchinfo": {"totalhits": titles.len()}, "search": hits}
        })))
        .mount(server)
        .await;
}

/// An OpenAI-compatible chat-completions endpoint that always answers `content`.
pub async fn mock_completion_server(api_key: &str, content: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", format!("Bearer {}", api_key).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    server
}

/// A server that answers every request with `status_code`.
pub async fn mock_error_server(status_code: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(status_code))
        .mount(&server)
        .await;

    server
}
