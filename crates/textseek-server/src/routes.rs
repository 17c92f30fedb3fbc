use crate::config::ServerConfig;
use crate::metrics;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use textseek_core::{Cursor, Dialect, SearchError};
use textseek_storage::{explain, paginated_filters, SearchRequest, SearchService, TokenPage};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: SearchService,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/search/paginated", get(search_paginated))
        .route("/search/by-tags", get(search_by_tags))
        .route("/suggest", get(suggest))
        .route("/admin/explain", post(admin_explain))
        .route("/metrics", get(metrics_text))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

struct ApiError(SearchError);

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            SearchError::InvalidQuery(_) | SearchError::Encoding(_) => StatusCode::BAD_REQUEST,
            SearchError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({"error": self.0.to_string(), "kind": self.0.kind()});
        (status, Json(body)).into_response()
    }
}

/// Count, time and tally the outcome of one operation.
async fn observe<T, F>(op: &'static str, items: impl Fn(&T) -> usize, fut: F) -> Result<T, ApiError>
where
    F: std::future::Future<Output = Result<T, SearchError>>,
{
    metrics::SEARCH_REQUESTS_TOTAL.with_label_values(&[op]).inc();
    let timer = metrics::SEARCH_QUERY_SECONDS
        .with_label_values(&[op])
        .start_timer();
    let out = fut.await;
    timer.observe_duration();
    match out {
        Ok(v) => {
            metrics::SEARCH_PAGE_ITEMS.observe(items(&v) as f64);
            Ok(v)
        }
        Err(e) => {
            metrics::SEARCH_ERRORS_TOTAL
                .with_label_values(&[op, e.kind()])
                .inc();
            Err(e.into())
        }
    }
}

fn required(name: &str, value: Option<String>) -> Result<String, SearchError> {
    value.ok_or_else(|| SearchError::invalid(format!("{name} is required")))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(Deserialize)]
struct SearchParams {
    keyword: Option<String>,
    min_views: Option<u64>,
    limit: Option<usize>,
}

async fn search(
    State(app): State<AppState>,
    Query(p): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = p.limit.unwrap_or(app.config.default_limit);
    let docs = observe("search", |docs: &Vec<_>| docs.len(), async {
        let keyword = required("keyword", p.keyword)?;
        app.service.search(&keyword, p.min_views, limit).await
    })
    .await?;
    Ok(Json(docs))
}

#[derive(Deserialize)]
struct PaginatedParams {
    keyword: Option<String>,
    cursor: Option<String>,
    last_published_at: Option<String>,
    last_id: Option<i64>,
    limit: Option<usize>,
}

/// Resume point given as the legacy `last_published_at` + `last_id` pair.
fn legacy_cursor(
    last_published_at: Option<&str>,
    last_id: Option<i64>,
) -> Result<Option<Cursor>, SearchError> {
    match (last_published_at, last_id) {
        (None, None) => Ok(None),
        (Some(at), Some(id)) => {
            let at = DateTime::parse_from_rfc3339(at)
                .map_err(|e| SearchError::encoding(format!("last_published_at: {e}")))?;
            Ok(Some(Cursor::new(at.with_timezone(&Utc), id)))
        }
        _ => Err(SearchError::invalid(
            "last_published_at and last_id must be given together",
        )),
    }
}

async fn search_paginated(
    State(app): State<AppState>,
    Query(p): Query<PaginatedParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = p.limit.unwrap_or(app.config.default_limit);
    let page = observe(
        "search_paginated",
        |page: &TokenPage| page.results.len(),
        async {
            let keyword = required("keyword", p.keyword)?;
            let legacy = legacy_cursor(p.last_published_at.as_deref(), p.last_id)?;
            match (p.cursor.as_deref(), legacy) {
                (Some(_), Some(_)) => Err(SearchError::invalid(
                    "cursor cannot be combined with last_published_at/last_id",
                )),
                (token, None) => {
                    app.service
                        .search_paginated_token(&keyword, token, limit)
                        .await
                }
                (None, cursor) => {
                    let page = app.service.search_paginated(&keyword, cursor, limit).await?;
                    Ok(TokenPage::from_page(page, &paginated_filters(&keyword)))
                }
            }
        },
    )
    .await?;
    Ok(Json(page))
}

#[derive(Deserialize)]
struct TagParams {
    tag: Option<String>,
    keyword: Option<String>,
    limit: Option<usize>,
}

async fn search_by_tags(
    State(app): State<AppState>,
    Query(p): Query<TagParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = p.limit.unwrap_or(app.config.default_limit);
    let docs = observe("search_by_tags", |docs: &Vec<_>| docs.len(), async {
        let tag = required("tag", p.tag)?;
        app.service
            .search_by_tags(&tag, p.keyword.as_deref(), limit)
            .await
    })
    .await?;
    Ok(Json(docs))
}

#[derive(Deserialize)]
struct SuggestParams {
    prefix: Option<String>,
    limit: Option<usize>,
}

async fn suggest(
    State(app): State<AppState>,
    Query(p): Query<SuggestParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = p.limit.unwrap_or(app.config.suggest_limit);
    let titles = observe("suggest", |titles: &Vec<_>| titles.len(), async {
        let prefix = required("prefix", p.prefix)?;
        app.service.suggest(&prefix, limit).await
    })
    .await?;
    Ok(Json(titles))
}

#[derive(Deserialize)]
struct ExplainBody {
    #[serde(flatten)]
    request: SearchRequest,
    #[serde(default)]
    dialect: Option<String>,
    #[serde(default)]
    table: Option<String>,
}

async fn admin_explain(Json(body): Json<ExplainBody>) -> Result<impl IntoResponse, ApiError> {
    let mut dialect = match body.dialect.as_deref() {
        Some(name) => Dialect::named(name)
            .ok_or_else(|| SearchError::invalid(format!("unknown dialect `{name}`")))?,
        None => Dialect::pgroonga(),
    };
    if let Some(table) = body.table {
        dialect = dialect.with_table(table)?;
    }
    let rendered = explain(&body.request, &dialect)?;
    Ok(Json(rendered))
}

async fn metrics_text() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    let _ = encoder.encode(&metric_families, &mut buf);
    (StatusCode::OK, String::from_utf8(buf).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::TimeZone;
    use serde_json::Value;
    use textseek_core::Document;
    use textseek_storage::InMemoryStore;
    use tower::ServiceExt;

    fn doc(id: i64, title: &str, tags: &[&str], views: u64) -> Document {
        Document {
            id,
            title: title.to_string(),
            author: "ann".to_string(),
            content: format!("notes on {title}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            view_count: views,
            published_at: Utc.timestamp_opt(1_700_000_000 + id * 60, 0).unwrap(),
        }
    }

    fn app() -> Router {
        let mut docs: Vec<Document> = (1..=15)
            .map(|i| doc(i, &format!("Postgres part {i}"), &["db"], i as u64))
            .collect();
        docs.push(doc(16, "Positivity", &["life"], 3));
        let store = InMemoryStore::from_documents(docs);
        build_router(AppState {
            service: SearchService::new(Arc::new(store)),
            config: Arc::new(ServerConfig::default()),
        })
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        call(app(), Request::get(uri).body(Body::empty()).unwrap()).await
    }

    #[tokio::test]
    async fn search_ranks_by_views() {
        let (status, body) = get_json("/search?keyword=postgres&min_views=10&limit=3").await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![15, 14, 13]);
    }

    #[tokio::test]
    async fn paginated_walks_with_token_and_legacy_pair() {
        let (status, first) = get_json("/search/paginated?keyword=postgres").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["results"].as_array().unwrap().len(), 10);
        assert_eq!(first["has_next"], true);
        let token = first["next_cursor"].as_str().unwrap().to_string();

        let (_, second) = get_json(&format!("/search/paginated?keyword=postgres&cursor={token}")).await;
        assert_eq!(second["results"].as_array().unwrap().len(), 5);
        assert_eq!(second["has_next"], false);
        assert!(second["next_cursor"].is_null());

        let at = first["last_published_at"].as_str().unwrap().replace('+', "%2B");
        let id = first["last_id"].as_i64().unwrap();
        let (_, legacy) = get_json(&format!(
            "/search/paginated?keyword=postgres&last_published_at={at}&last_id={id}"
        ))
        .await;
        assert_eq!(legacy["results"], second["results"]);
    }

    #[tokio::test]
    async fn paginated_rejects_bad_resume_points() {
        let (status, body) = get_json("/search/paginated?keyword=postgres&cursor=garbage").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "encoding_error");

        let (status, body) = get_json("/search/paginated?keyword=postgres&last_id=3").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_query");

        let (status, body) =
            get_json("/search/paginated?keyword=postgres&last_published_at=yesterday&last_id=3")
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "encoding_error");
    }

    #[tokio::test]
    async fn missing_or_blank_criteria_are_invalid() {
        for uri in ["/search", "/search?keyword=", "/suggest", "/search/by-tags?tag="] {
            let (status, body) = get_json(uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["kind"], "invalid_query", "{uri}");
        }
        let (status, _) = get_json("/search?keyword=go&limit=500").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tags_and_suggest() {
        let (status, body) = get_json("/search/by-tags?tag=life").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["title"], "Positivity");

        let (status, body) = get_json("/search/by-tags?tag=life&keyword=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = get_json("/suggest?prefix=pos&limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["Positivity", "Postgres part 1"]));
    }

    #[tokio::test]
    async fn explain_renders_without_executing() {
        let req = Request::post("/admin/explain")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"op": "search", "keyword": "go", "dialect": "generic", "table": "blog_posts"})
                    .to_string(),
            ))
            .unwrap();
        let (status, body) = call(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        let sql = body["sql"].as_str().unwrap();
        assert!(sql.contains("FROM blog_posts"));
        assert!(sql.contains("fulltext_match("));
    }

    #[tokio::test]
    async fn explain_rejects_table_names_that_are_not_identifiers() {
        let req = Request::post("/admin/explain")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"op": "suggest", "prefix": "po", "table": "posts; DROP TABLE posts"})
                    .to_string(),
            ))
            .unwrap();
        let (status, body) = call(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_query");
    }

    #[tokio::test]
    async fn health_and_metrics() {
        let resp = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let _ = get_json("/search?keyword=postgres").await;
        let resp = app()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("search_requests_total"));
    }
}
