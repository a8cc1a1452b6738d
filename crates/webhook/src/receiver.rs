use crate::notification::{Envelope, PaymentNotification};
use crate::{verify, NotificationSink, WebhookError};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use std::sync::Arc;

pub const NOTIFY_PATH: &str = "/expresspay/notify";
pub const SIGNATURE_HEADER: &str = "signature";

#[derive(Clone)]
pub struct WebhookState {
    secret: Arc<str>,
    sink: Arc<dyn NotificationSink>,
}

impl WebhookState {
    pub fn new(secret: impl Into<Arc<str>>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            secret: secret.into(),
            sink,
        }
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route(NOTIFY_PATH, post(receive))
        .with_state(state)
}

async fn receive(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    match accept(&state, &headers, &body).await {
        Ok(n) => {
            tracing::info!(
                cmd_type = n.cmd_type,
                account_no = ?n.account_no,
                "Payment notification accepted"
            );
            StatusCode::OK
        }
        Err(e) => {
            let code = e.status_code();
            if code.is_server_error() {
                tracing::error!(error = %e, "Payment notification processing failed");
            } else {
                tracing::warn!(error = %e, status = code.as_u16(), "Payment notification rejected");
            }
            code
        }
    }
}

/// Decodes, authenticates and hands a notification to the sink.
///
/// The signature covers the raw `Data` text when it arrives as a body field,
/// or the whole raw body when it arrives in the `Signature` header. Either way
/// it is checked before `Data` is parsed.
pub async fn accept(
    state: &WebhookState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<PaymentNotification, WebhookError> {
    let envelope = decode_envelope(headers, body)?;
    let data = envelope
        .data
        .filter(|d| !d.trim().is_empty())
        .ok_or(WebhookError::MissingData)?;

    let header_signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let authentic = match (envelope.signature, header_signature) {
        (Some(sig), _) => verify(data.as_bytes(), &sig, &state.secret),
        (None, Some(sig)) => verify(body, &sig, &state.secret),
        (None, None) => verify(body, "", &state.secret),
    };
    if !authentic {
        return Err(WebhookError::Signature);
    }

    let notification: PaymentNotification =
        serde_json::from_str(&data).map_err(WebhookError::Payload)?;

    state
        .sink
        .deliver(&notification)
        .await
        .map_err(WebhookError::Sink)?;

    Ok(notification)
}

fn decode_envelope(headers: &HeaderMap, body: &[u8]) -> Result<Envelope, WebhookError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(WebhookError::MissingData);
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or_else(|| body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{'));

    if is_json {
        serde_json::from_slice(body).map_err(|e| WebhookError::Envelope(e.to_string()))
    } else {
        serde_urlencoded::from_bytes(body).map_err(|e| WebhookError::Envelope(e.to_string()))
    }
}
