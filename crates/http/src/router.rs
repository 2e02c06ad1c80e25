//! Router builder for the bookshelf HTTP server
//!
//! Layers only wrap routes that exist when they are added, so callers mount
//! routes and fallbacks first and middleware last.

use std::any::Any;
use std::time::Duration;

use axum::{
    extract::Request,
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::{Timestamp, Uuid};

use bookshelf_kernel::ModuleRegistry;

use crate::error::{AppError, URL_NOT_FOUND_MESSAGE};

/// Builder for constructing the main HTTP router
pub struct RouterBuilder {
    router: Router,
    api_prefix: String,
}

impl RouterBuilder {
    /// Create a new router builder with modules mounted at the root
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Create a new router builder mounting modules under `api_prefix`
    pub fn with_prefix(api_prefix: &str) -> Self {
        Self {
            router: Router::new(),
            api_prefix: normalize_prefix(api_prefix),
        }
    }

    /// Path a module named `module_name` is mounted at
    pub fn mount_path(&self, module_name: &str) -> String {
        format!("{}/{}", self.api_prefix, module_name)
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router under `{api_prefix}/{module_name}`
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        let path = self.mount_path(module_name);
        self.router = self.router.nest(&path, module_router);
        self
    }

    /// Answer unmatched paths and unsupported methods with error envelopes
    pub fn with_fallbacks(mut self) -> Self {
        self.router = self
            .router
            .fallback(route_not_found)
            .method_not_allowed_fallback(method_not_allowed);
        self
    }

    /// Convert handler panics into the generic error envelope
    pub fn with_panic_handler(mut self) -> Self {
        self.router = self.router.layer(CatchPanicLayer::custom(handle_panic));
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.router = self.router.layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        );
        self
    }

    /// Add request ID middleware, echoing `x-request-id` on the response
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::new(Duration::from_millis(timeout_ms)));
        self
    }

    /// Add OpenAPI documentation by collecting specs from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let mut openapi_spec = serde_json::json!({
            "openapi": "3.0.0",
            "info": {
                "title": "Bookshelf API",
                "version": "1.0.0",
                "description": "Read-only book catalog"
            },
            "paths": {},
            "components": {
                "schemas": {}
            }
        });

        openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
            "type": "object",
            "properties": {
                "error": { "type": "string" },
                "message": { "type": "string" },
                "status_code": { "type": "integer" }
            },
            "required": ["error", "message", "status_code"]
        });

        openapi_spec["paths"]["/healthz"] = serde_json::json!({
            "get": {
                "summary": "Health check",
                "responses": {
                    "200": {
                        "description": "OK",
                        "content": {
                            "text/plain": {
                                "schema": {
                                    "type": "string"
                                }
                            }
                        }
                    }
                }
            }
        });

        for module in registry.modules() {
            let Some(module_spec) = module.openapi() else {
                continue;
            };
            let mount = self.mount_path(module.name());

            if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
                for (path, path_item) in paths {
                    let prefixed_path = if path == "/" {
                        mount.clone()
                    } else {
                        format!("{}{}", mount, path)
                    };
                    openapi_spec["paths"][prefixed_path] = path_item.clone();
                }
            }

            if let Some(schemas) = module_spec
                .get("components")
                .and_then(|c| c.get("schemas"))
                .and_then(|s| s.as_object())
            {
                for (schema_name, schema_def) in schemas {
                    openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
                }
            }
        }

        // SwaggerUI wants a typed document; fall back to a bare one if the merge
        // produced something utoipa cannot read.
        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(openapi_spec.clone())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "merged OpenAPI document rejected by utoipa");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title("Bookshelf API")
                            .version("1.0.0")
                            .build(),
                    )
                    .build()
            });

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

async fn route_not_found() -> AppError {
    AppError::not_found(URL_NOT_FOUND_MESSAGE)
}

async fn method_not_allowed() -> AppError {
    AppError::Unexpected(anyhow::anyhow!("method not allowed"))
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };

    AppError::Unexpected(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

/// Request ID generator for tracing
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorBody, UNEXPECTED_ERROR_MESSAGE};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn send(router: Router, method: Method, uri: &str) -> (StatusCode, Response) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        (response.status(), response)
    }

    async fn envelope(response: Response) -> ErrorBody {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn module_router() -> Router {
        Router::new()
            .route("/", get(|| async { "module" }))
            .route("/boom", get(explode))
    }

    async fn explode() -> &'static str {
        panic!("handler exploded")
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(RouterBuilder::new().mount_path("books"), "/books");
        assert_eq!(
            RouterBuilder::with_prefix("api/").mount_path("books"),
            "/api/books"
        );
        assert_eq!(
            RouterBuilder::with_prefix("/").mount_path("books"),
            "/books"
        );
    }

    #[tokio::test]
    async fn test_module_mounting_under_prefix() {
        let router = RouterBuilder::with_prefix("/api")
            .mount_module("test", module_router())
            .with_fallbacks()
            .build();

        let (status, _) = send(router.clone(), Method::GET, "/api/test").await;
        assert_eq!(status, StatusCode::OK);

        let (status, response) = send(router, Method::GET, "/test").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(envelope(response).await.message, URL_NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_unsupported_method_uses_generic_envelope() {
        let router = RouterBuilder::new()
            .mount_module("test", module_router())
            .with_fallbacks()
            .build();

        let (status, response) = send(router, Method::DELETE, "/test").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = envelope(response).await;
        assert_eq!(body.error, "Internal Server Error");
        assert_eq!(body.message, UNEXPECTED_ERROR_MESSAGE);
        assert_eq!(body.status_code, 500);
    }

    #[tokio::test]
    async fn test_panic_uses_generic_envelope() {
        let router = RouterBuilder::new()
            .mount_module("test", module_router())
            .with_fallbacks()
            .with_panic_handler()
            .build();

        let (status, response) = send(router, Method::GET, "/test/boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            envelope(response).await,
            ErrorBody {
                error: "Internal Server Error".to_string(),
                message: UNEXPECTED_ERROR_MESSAGE.to_string(),
                status_code: 500,
            }
        );
    }

    #[tokio::test]
    async fn test_middleware_chain_sets_request_id() {
        let router = RouterBuilder::new()
            .route("/health", get(|| async { "ok" }))
            .with_panic_handler()
            .with_timeout(5000)
            .with_request_id()
            .with_cors()
            .with_tracing()
            .build();

        let (status, response) = send(router, Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(Uuid::parse_str(request_id).is_ok());
    }
}
