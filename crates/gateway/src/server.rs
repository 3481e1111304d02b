use {
    axum::{
        Json, Router,
        extract::State,
        response::{Html, IntoResponse, Response},
        routing::get,
    },
    stickerbot_channels::{PairingState, render_svg},
    tokio_util::sync::CancellationToken,
    tower_http::trace::TraceLayer,
    tracing::info,
};

const LIVENESS: &str = "Sticker bot is running! 🤖";
const NO_PAIRING_CODE: &str = "Pairing code not available yet, or the session is already authenticated.";

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub pairing: PairingState,
    pub version: String,
}

impl AppState {
    pub fn new(pairing: PairingState) -> Self {
        Self {
            pairing,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the status router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/qr", get(qr_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the status surface until `shutdown` fires.
pub async fn serve(
    bind: &str,
    port: u16,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "status server listening");

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn root_handler() -> &'static str {
    LIVENESS
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "paired": state.pairing.is_connected(),
        "pairing_pending": state.pairing.is_pending(),
    }))
}

async fn qr_handler(State(state): State<AppState>) -> Response {
    match state.pairing.current() {
        Some(code) => {
            let image = render_svg(&code).unwrap_or_default();
            Html(format!("{image}<pre>{}</pre>", escape_html(&code))).into_response()
        },
        None => NO_PAIRING_CODE.into_response(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        axum::{
            body::{Body, to_bytes},
            http::{Request, StatusCode, header},
        },
        tower::ServiceExt as _,
    };

    async fn fetch(pairing: &PairingState, uri: &str) -> (StatusCode, Option<String>, String) {
        let app = build_app(AppState::new(pairing.clone()));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let (status, _, body) = fetch(&PairingState::new(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("running"));
    }

    #[tokio::test]
    async fn health_reflects_pairing() {
        let pairing = PairingState::new();
        let (status, content_type, body) = fetch(&pairing, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("application/json"));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["paired"], false);

        pairing.mark_connected();
        let (_, _, body) = fetch(&pairing, "/health").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["paired"], true);
    }

    #[tokio::test]
    async fn qr_shows_pending_code() {
        let pairing = PairingState::new();
        pairing.issue("2@abc<def>");

        let (status, content_type, body) = fetch(&pairing, "/qr").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
        assert!(body.starts_with("<svg"));
        assert!(body.ends_with("<pre>2@abc&lt;def&gt;</pre>"));
    }

    #[tokio::test]
    async fn qr_without_code_says_so() {
        let pairing = PairingState::new();
        pairing.issue("2@old");
        pairing.mark_connected();

        let (status, _, body) = fetch(&pairing, "/qr").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("not available"));
        assert!(!body.contains("<pre>"));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, ..) = fetch(&PairingState::new(), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
