//! HTTP surface for the news grouper.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /groupers` – List registered groupers with their descriptions.
//! - `POST /group` – Group a list of posts with a named grouper. Accepts `{ "grouper", "posts" }`
//!   and returns `{ "post_groups": [...], "posts": [...] }`: summarized groups first, then the
//!   posts that stayed on their own.
//! - `GET /metrics` – Observe grouping counters.
//!
//! The CLI drives the same [`GroupingApi`], so behavior is identical across interfaces.

use crate::grouping::{GrouperDescriptor, GroupingApi, GroupingError};
use crate::metrics::MetricsSnapshot;
use crate::models::{GroupedPosts, Post};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the grouping API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: GroupingApi + 'static,
{
    Router::new()
        .route("/groupers", get(list_groupers::<S>))
        .route("/group", post(group_posts::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Request body for the `POST /group` endpoint.
#[derive(Deserialize)]
struct GroupRequest {
    /// Exact, case-sensitive grouper name.
    grouper: String,
    /// Posts to group.
    posts: Vec<Post>,
}

/// Response body for `GET /groupers`.
#[derive(Serialize)]
struct GroupersResponse {
    groupers: Vec<GrouperDescriptor>,
}

async fn list_groupers<S>(State(service): State<Arc<S>>) -> Json<GroupersResponse>
where
    S: GroupingApi,
{
    Json(GroupersResponse {
        groupers: service.list_groupers(),
    })
}

/// Group posts with the requested grouper.
///
/// Provider failures never fail the request; only an empty post list or an unknown grouper
/// name produce a client error.
async fn group_posts<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<GroupRequest>,
) -> Result<Json<GroupedPosts>, AppError>
where
    S: GroupingApi,
{
    let GroupRequest { grouper, posts } = request;
    let grouped = GroupedPosts::from(service.group_posts(posts, &grouper).await?);
    tracing::info!(
        grouper = %grouper,
        groups = grouped.post_groups.len(),
        standalone = grouped.posts.len(),
        "Group request completed"
    );
    Ok(Json(grouped))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: GroupingApi,
{
    Json(service.metrics_snapshot())
}

struct AppError(GroupingError);

/// Every grouping error is a client-input problem.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl From<GroupingError> for AppError {
    fn from(inner: GroupingError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::grouping::{GrouperDescriptor, GroupingApi, GroupingError};
    use crate::metrics::MetricsSnapshot;
    use crate::models::{GroupedItem, Post, PostGroup};
    use crate::sources::ConfiguredSource;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use time::OffsetDateTime;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    /// Pairs every two posts into a group and records the grouper names it was asked for.
    #[derive(Default)]
    struct StubGroupingService {
        calls: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl GroupingApi for StubGroupingService {
        async fn group_posts(
            &self,
            posts: Vec<Post>,
            grouper_name: &str,
        ) -> Result<Vec<GroupedItem>, GroupingError> {
            self.calls
                .lock()
                .await
                .push((grouper_name.to_string(), posts.len()));
            if posts.is_empty() {
                return Err(GroupingError::NoInput);
            }
            if grouper_name != "Stub" {
                return Err(GroupingError::UnknownGrouper(grouper_name.to_string()));
            }
            Ok(posts
                .chunks(2)
                .map(|chunk| match chunk {
                    [single] => GroupedItem::Post(single.clone()),
                    many => GroupedItem::Group(PostGroup {
                        posts: many.to_vec(),
                        summary: "Paired".into(),
                    }),
                })
                .collect())
        }

        async fn group_sources(
            &self,
            _sources: &[ConfiguredSource],
            _from: OffsetDateTime,
            _to: Option<OffsetDateTime>,
            _grouper_name: &str,
        ) -> Result<Vec<GroupedItem>, GroupingError> {
            Err(GroupingError::NoPostsAvailable)
        }

        fn list_groupers(&self) -> Vec<GrouperDescriptor> {
            vec![GrouperDescriptor {
                name: "Stub".into(),
                description: "Pairs posts".into(),
            }]
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                requests: 3,
                ..MetricsSnapshot::default()
            }
        }
    }

    fn post_json(title: &str) -> serde_json::Value {
        json!({
            "title": title,
            "body": format!("{title} body"),
            "published_time": "2025-03-01T12:00:00Z",
            "author": "Desk",
            "link": format!("https://news.example/{title}")
        })
    }

    async fn send(
        service: Arc<StubGroupingService>,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = create_router(service)
            .oneshot(request.body(body).expect("request"))
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn group_route_splits_groups_from_standalone_posts() {
        let service = Arc::new(StubGroupingService::default());
        let payload = json!({
            "grouper": "Stub",
            "posts": [post_json("a"), post_json("b"), post_json("c")]
        });

        let (status, body) = send(service.clone(), Method::POST, "/group", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["post_groups"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["post_groups"][0]["summary"], "Paired");
        assert_eq!(body["post_groups"][0]["posts"][1]["title"], "b");
        assert_eq!(body["posts"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["posts"][0]["title"], "c");
        assert_eq!(body["posts"][0]["published_time"], "2025-03-01T12:00:00Z");
        assert_eq!(*service.calls.lock().await, vec![("Stub".to_string(), 3)]);
    }

    #[tokio::test]
    async fn unknown_grouper_is_a_bad_request() {
        let service = Arc::new(StubGroupingService::default());
        let payload = json!({ "grouper": "stub", "posts": [post_json("a")] });

        let (status, body) = send(service, Method::POST, "/group", Some(payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown grouper: stub");
    }

    #[tokio::test]
    async fn empty_post_list_is_a_bad_request() {
        let service = Arc::new(StubGroupingService::default());
        let payload = json!({ "grouper": "Stub", "posts": [] });

        let (status, _) = send(service, Method::POST, "/group", Some(payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn groupers_and_metrics_routes_expose_service_state() {
        let service = Arc::new(StubGroupingService::default());

        let (status, groupers) = send(service.clone(), Method::GET, "/groupers", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(groupers["groupers"][0]["name"], "Stub");
        assert_eq!(groupers["groupers"][0]["description"], "Pairs posts");

        let (status, metrics) = send(service, Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(metrics["requests"], 3);
        assert_eq!(metrics["summary_fallbacks"], 0);
    }
}
