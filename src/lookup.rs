//! Lookup client: resolve sub-references against the verse service and
//! normalize the results into popup tabs.
//!
//! One query per sub-reference, all in flight at once, joined before
//! anything is rendered. A failing query contributes no tabs; it never fails
//! the whole resolution.

use crate::error::{Error, Result};
use crate::models::{SearchItem, SearchResponse, Tab};
use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Service Interface
// ============================================================================

#[async_trait]
pub trait LookupService: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResponse>;
}

/// `GET {base_url}/search?query=...` over HTTP.
#[derive(Clone)]
pub struct HttpLookupService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLookupService {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn search_url(&self, query: &str) -> String {
        format!("{}/search?query={}", self.base_url, urlencoding::encode(query))
    }
}

#[async_trait]
impl LookupService for HttpLookupService {
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let response = self.client.get(self.search_url(query)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::LookupStatus {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Tab for a verse entry; `None` for prompts, "no result" rows and per-verse
/// detail rows.
pub fn tab_from_item(item: &SearchItem) -> Option<Tab> {
    if !item.is_verse_entry() {
        return None;
    }
    Some(Tab {
        label: item.title.clone(),
        content: item.arg.clone().unwrap_or_default(),
        footer: item.footer_text.clone().unwrap_or_default(),
        storage_key: item
            .pure_ref
            .clone()
            .unwrap_or_else(|| item.title.clone()),
    })
}

pub fn tabs_from_response(response: &SearchResponse) -> Vec<Tab> {
    response.items.iter().filter_map(tab_from_item).collect()
}

// ============================================================================
// Client
// ============================================================================

pub struct LookupClient<S: ?Sized> {
    service: Arc<S>,
}

impl<S: ?Sized> Clone for LookupClient<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S: LookupService + ?Sized> LookupClient<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Tabs for every sub-reference, in sub-reference order and then in the
    /// order the service listed them.
    pub async fn resolve(&self, sub_references: &[String]) -> Vec<Tab> {
        let queries = sub_references.iter().map(|reference| async move {
            match self.service.search(reference).await {
                Ok(response) => tabs_from_response(&response),
                Err(e) => {
                    debug!("Lookup for {:?} failed: {}", reference, e);
                    Vec::new()
                }
            }
        });

        join_all(queries).await.into_iter().flatten().collect()
    }
}

/// Keep `index` if it addresses a tab, otherwise fall back to the first.
pub fn clamp_tab_index(index: usize, tab_count: usize) -> usize {
    if index < tab_count {
        index
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned responses with per-query latency; unknown queries fail.
    struct FakeService {
        responses: HashMap<String, (u64, SearchResponse)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeService {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with(mut self, query: &str, delay_ms: u64, items: Vec<SearchItem>) -> Self {
            self.responses
                .insert(query.to_string(), (delay_ms, SearchResponse { items }));
            self
        }
    }

    #[async_trait]
    impl LookupService for FakeService {
        async fn search(&self, query: &str) -> Result<SearchResponse> {
            self.calls.lock().unwrap().push(query.to_string());
            match self.responses.get(query) {
                Some((delay, response)) => {
                    tokio::time::sleep(Duration::from_millis(*delay)).await;
                    Ok(response.clone())
                }
                None => Err(Error::LookupStatus { status: 500 }),
            }
        }
    }

    fn entry(title: &str, body: &str) -> SearchItem {
        SearchItem {
            title: title.to_string(),
            subtitle: "Enter: 전체 | Cmd: 본문만 | Opt: 주소+본문".to_string(),
            arg: Some(body.to_string()),
            pure_ref: Some(title.to_string()),
            footer_text: Some(format!("{} footer", title)),
            ..Default::default()
        }
    }

    fn subs(refs: &[&str]) -> Vec<String> {
        refs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_only_enter_items_become_tabs() {
        let response = SearchResponse {
            items: vec![
                entry("요한복음 3:16", "16. text"),
                SearchItem {
                    title: "16절".to_string(),
                    subtitle: "text".to_string(),
                    arg: Some("16. text".to_string()),
                    ..Default::default()
                },
                SearchItem::info("검색 결과 없음", "nothing"),
            ],
        };
        let tabs = tabs_from_response(&response);
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].label, "요한복음 3:16");
        assert_eq!(tabs[0].content, "16. text");
        assert_eq!(tabs[0].footer, "요한복음 3:16 footer");
    }

    #[test]
    fn test_storage_key_falls_back_to_title() {
        let mut item = entry("John 3:16", "text");
        item.pure_ref = None;
        assert_eq!(tab_from_item(&item).unwrap().storage_key, "John 3:16");
    }

    #[tokio::test]
    async fn test_resolve_keeps_input_order_despite_latency() {
        let service = FakeService::new()
            .with("John 3:16", 80, vec![entry("John 3:16", "a")])
            .with("Romans 8:28", 5, vec![entry("Romans 8:28", "b")]);
        let client = LookupClient::new(Arc::new(service));

        let tabs = client.resolve(&subs(&["John 3:16", "Romans 8:28"])).await;
        let labels: Vec<&str> = tabs.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["John 3:16", "Romans 8:28"]);
    }

    #[tokio::test]
    async fn test_resolve_issues_one_query_per_sub_reference() {
        let service = Arc::new(
            FakeService::new()
                .with("John 3:16", 0, vec![entry("John 3:16", "a")])
                .with("Romans 8:28", 0, vec![entry("Romans 8:28", "b")]),
        );
        let client = LookupClient::new(Arc::clone(&service));
        client.resolve(&subs(&["John 3:16", "Romans 8:28"])).await;

        let mut calls = service.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec!["John 3:16", "Romans 8:28"]);
    }

    #[tokio::test]
    async fn test_resolve_runs_queries_concurrently() {
        let service = FakeService::new()
            .with("a", 150, vec![entry("a", "a")])
            .with("b", 150, vec![entry("b", "b")])
            .with("c", 150, vec![entry("c", "c")]);
        let client = LookupClient::new(Arc::new(service));

        let started = std::time::Instant::now();
        let tabs = client.resolve(&subs(&["a", "b", "c"])).await;
        assert_eq!(tabs.len(), 3);
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_failed_item_is_omitted() {
        let service = FakeService::new().with("Romans 8:28", 0, vec![entry("Romans 8:28", "b")]);
        let client = LookupClient::new(Arc::new(service));

        let tabs = client.resolve(&subs(&["Nowhere 1:1", "Romans 8:28"])).await;
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].label, "Romans 8:28");
    }

    #[tokio::test]
    async fn test_multi_entry_results_are_flattened_in_order() {
        let service = FakeService::new()
            .with("창 1-2", 20, vec![entry("창세기 1장", "one"), entry("창세기 2장", "two")])
            .with("요 3:16", 0, vec![entry("요한복음 3:16", "three")]);
        let client = LookupClient::new(Arc::new(service));

        let tabs = client.resolve(&subs(&["창 1-2", "요 3:16"])).await;
        let labels: Vec<&str> = tabs.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["창세기 1장", "창세기 2장", "요한복음 3:16"]);
    }

    #[tokio::test]
    async fn test_all_failures_yield_no_tabs() {
        let client = LookupClient::new(Arc::new(FakeService::new()));
        assert!(client.resolve(&subs(&["x", "y"])).await.is_empty());
    }

    #[test]
    fn test_clamp_tab_index() {
        assert_eq!(clamp_tab_index(1, 2), 1);
        assert_eq!(clamp_tab_index(2, 2), 0);
        assert_eq!(clamp_tab_index(0, 0), 0);
    }

    #[test]
    fn test_search_url_is_encoded() {
        let service = HttpLookupService::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(
            service.search_url("요 3:16"),
            "http://127.0.0.1:8000/search?query=%EC%9A%94%203%3A16"
        );
    }

    #[tokio::test]
    async fn test_resolve_over_http_against_router() {
        let bible = crate::bible::BibleIndex::from_json(
            r#"{"요3:16": "하나님이 세상을 이처럼 사랑하사", "창1:1": "태초에 하나님이 천지를 창조하시니라"}"#,
        )
        .unwrap();
        let app = crate::handlers::router(Arc::new(crate::AppState::with_bible(bible)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let service = HttpLookupService::new(format!("http://{}", addr)).unwrap();
        let client = LookupClient::new(Arc::new(service));

        // The per-verse "16절" row is not a tab; the prompt for "창:" is not
        // either.
        let tabs = client.resolve(&subs(&["요 3:16", "창:"])).await;
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].label, "요한복음 3:16");
        assert_eq!(tabs[0].storage_key, "요한복음 3:16");
        assert_eq!(tabs[0].content, "16. 하나님이 세상을 이처럼 사랑하사");
        assert_eq!(tabs[0].footer, "요한복음 3장 16절");
    }
}
