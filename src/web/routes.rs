use super::handlers::healthz_handler;
use crate::{auth::logout_handler, AppState};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router: Router<Arc<AppState>> =
        Router::new().route("/healthz", get(healthz_handler));

    // The logout route only exists when logout is enabled for the provider
    if let Some(logout) = &state.logout {
        tracing::info!(
            provider = %state.provider.slug_id,
            redirect_param = %logout.redirect_param(),
            "Registering /auth/logout"
        );
        router = router.route("/auth/logout", get(logout_handler));
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{build_logout_redirect, ProviderClient, RootUrlResolver};
    use crate::model::{LogoutConfig, OidcProvider};
    use axum::{
        body::Body,
        http::{
            header::{HOST, LOCATION},
            Request, StatusCode,
        },
    };
    use tower::ServiceExt;

    fn provider(logout_enabled: bool) -> OidcProvider {
        OidcProvider {
            slug_id: "test".to_string(),
            name: "Test".to_string(),
            client_id: "c1".to_string(),
            issuer: "https://p.example.com".to_string(),
            discovery_url: None,
            end_session_endpoint: Some("https://p.example.com/logout?existing=param".to_string()),
            http_timeout: Default::default(),
            logout: LogoutConfig {
                enabled: logout_enabled,
                logout_redirect_param_name: String::new(),
            },
        }
    }

    fn state(logout_enabled: bool) -> Arc<AppState> {
        let provider = provider(logout_enabled);
        let client = ProviderClient::new("c1", "https://p.example.com/logout?existing=param");
        let logout = build_logout_redirect(
            &provider.logout,
            Arc::new(client),
            Arc::new(RootUrlResolver::default()),
        )
        .map(Arc::new);
        Arc::new(AppState {
            provider: Arc::new(provider),
            logout,
        })
    }

    fn logout_request() -> Request<Body> {
        Request::builder()
            .uri("/auth/logout")
            .header(HOST, "internal:8080")
            .header("x-forwarded-host", "h:8080")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let response = create_router(state(false))
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_route_redirects_when_enabled() {
        let response = create_router(state(true))
            .oneshot(logout_request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://p.example.com/logout?"));
        assert!(location.contains("existing=param"));
        assert!(location.contains("post_logout_redirect_uri=http%3A%2F%2Fh%3A8080"));
        assert!(location.contains("client_id=c1"));
    }

    #[tokio::test]
    async fn test_logout_route_absent_when_disabled() {
        let response = create_router(state(false))
            .oneshot(logout_request())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_logout_route_uses_router_state() {
        let state = state(true);
        let response = create_router(state.clone())
            .oneshot(logout_request())
            .await
            .unwrap();

        let expected = state
            .logout
            .as_ref()
            .unwrap()
            .location(&logout_request().into_parts().0);
        assert_eq!(response.headers()[LOCATION].to_str().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_app_state_build_skips_discovery_when_disabled() {
        let mut provider = provider(false);
        // Discovery against this issuer would fail
        provider.end_session_endpoint = None;
        provider.issuer = "http://127.0.0.1:9".to_string();

        let state = AppState::build(provider, RootUrlResolver::default())
            .await
            .unwrap();
        assert!(state.logout.is_none());
    }
}
