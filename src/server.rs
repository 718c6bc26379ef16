use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use anyhow::Result;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::orchestrator::{Profile, ProfileService};
use crate::services::ImageUpload;
use crate::taxonomy::TaxonomyMap;

struct ServerError(StatusCode, anyhow::Error);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = format!("FaunaFinder Error: {:#}", self.1);
        (self.0, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for ServerError where E: Into<anyhow::Error> {
    fn from(err: E) -> Self { Self(StatusCode::INTERNAL_SERVER_ERROR, err.into()) }
}

#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/taxonomy/{label}", get(taxonomy))
        .route("/v1/profile/{label}", get(profile))
        .route("/v1/identify", post(identify))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: &str) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("FaunaFinder listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn taxonomy(State(state): State<AppState>, Path(label): Path<String>) -> Json<TaxonomyMap> {
    Json(state.profiles.resolver().resolve_taxonomy(&label).await)
}

async fn profile(State(state): State<AppState>, Path(label): Path<String>) -> Json<Profile> {
    Json(state.profiles.profile(&label).await)
}

async fn identify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Profile>, ServerError> {
    if !state.profiles.has_classifier() {
        return Err(ServerError(
            StatusCode::SERVICE_UNAVAILABLE,
            anyhow::anyhow!("image identification is not configured"),
        ));
    }
    if body.is_empty() {
        return Err(ServerError(StatusCode::BAD_REQUEST, anyhow::anyhow!("request body must contain an image")));
    }

    let mut upload = ImageUpload::new(body.to_vec());
    if let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        upload = upload.with_content_type(content_type);
    }

    let profile = state.profiles.identify(&upload).await?;
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FixtureEntity, FixtureGraph};
    use crate::services::{Classification, ImageClassifier, Summary, SummaryProvider};
    use crate::taxonomy::TaxonomyResolver;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct NoSummary;

    #[async_trait]
    impl SummaryProvider for NoSummary {
        async fn summarize(&self, label: &str) -> Result<Summary> {
            anyhow::bail!("no page for {}", label)
        }
    }

    struct OwlClassifier;

    #[async_trait]
    impl ImageClassifier for OwlClassifier {
        async fn classify(&self, _image: &ImageUpload) -> Result<Classification> {
            Ok(Classification { label: "Bubo bubo".to_string(), confidence: 0.7, image_url: None })
        }
    }

    fn state(with_classifier: bool) -> AppState {
        let graph = FixtureGraph::new()
            .with_entity(FixtureEntity::new("Q25332").sitelink("Bubo bubo").claim("P171", "Q466929"))
            .with_entity(FixtureEntity::taxon("Q466929", "Bubo", "Q34740"));
        let mut service = ProfileService::new(TaxonomyResolver::new(Arc::new(graph)), Arc::new(NoSummary));
        if with_classifier {
            service = service.with_classifier(Arc::new(OwlClassifier));
        }
        AppState { profiles: Arc::new(service) }
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_taxonomy_route() {
        let response = router(state(false))
            .oneshot(Request::builder().uri("/v1/taxonomy/Bubo%20bubo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json, serde_json::json!({ "Genus": "Bubo", "Species": "Bubo bubo" }));
    }

    #[tokio::test]
    async fn test_profile_route_degrades_summary() {
        let response = router(state(false))
            .oneshot(Request::builder().uri("/v1/profile/Unicornius%20mythicus").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["summary"], "");
        assert_eq!(json["taxonomy"], serde_json::json!({ "Species": "Unicornius mythicus" }));
    }

    #[tokio::test]
    async fn test_identify_without_classifier_is_unavailable() {
        let response = router(state(false))
            .oneshot(Request::builder().method("POST").uri("/v1/identify").body(Body::from(vec![1u8, 2, 3])).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_identify_route() {
        let response = router(state(true))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/identify")
                    .header("content-type", "image/jpeg")
                    .body(Body::from(vec![0xffu8, 0xd8, 0xff]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["label"], "Bubo bubo");
        assert_eq!(json["taxonomy"]["Genus"], "Bubo");
    }

    #[tokio::test]
    async fn test_identify_rejects_empty_body() {
        let response = router(state(true))
            .oneshot(Request::builder().method("POST").uri("/v1/identify").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
