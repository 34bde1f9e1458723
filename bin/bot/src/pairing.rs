//! Pairing display page.
//!
//! Serves a small self-refreshing page that renders the pending pairing
//! token as a QR code (via a third-party QR image service) until the
//! session reports connected.

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use chat_relay_session::PairingView;

/// Build the pairing display router.
pub fn router(view: watch::Receiver<PairingView>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .layer(CorsLayer::permissive())
        .with_state(view)
}

async fn index() -> Html<&'static str> {
    Html(PAIRING_HTML)
}

async fn status(State(view): State<watch::Receiver<PairingView>>) -> Json<PairingView> {
    Json(view.borrow().clone())
}

const PAIRING_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Pair your messenger</title>
    <style>
        body { font-family: system-ui, sans-serif; display: flex; flex-direction: column;
               align-items: center; margin-top: 4rem; color: #222; }
        #qr { width: 300px; height: 300px; }
        #hint { color: #666; }
    </style>
</head>
<body>
    <h1>Pair your messenger</h1>
    <div id="panel"><p id="hint">Waiting for a pairing token&hellip;</p></div>
    <script>
        async function refresh() {
            try {
                const res = await fetch('/status');
                const view = await res.json();
                const panel = document.getElementById('panel');
                if (view.state === 'connected') {
                    panel.innerHTML = '<p>&#9989; Connected. You can close this page.</p>';
                } else if (view.state === 'pairing' && view.token) {
                    const src = 'https://api.qrserver.com/v1/create-qr-code/?size=300x300&data='
                        + encodeURIComponent(view.token);
                    panel.innerHTML = '<img id="qr" src="' + src + '" alt="pairing QR">'
                        + '<p id="hint">Scan with your phone. The code rotates; keep this page open.</p>';
                } else {
                    panel.innerHTML = '<p id="hint">Waiting for a pairing token&hellip;</p>';
                }
            } catch (e) {
                // Relay restarting; keep polling.
            }
        }
        refresh();
        setInterval(refresh, 2000);
    </script>
</body>
</html>
"#;
