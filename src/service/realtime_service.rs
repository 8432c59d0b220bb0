// service/realtime_service.rs
use serde_json::Value;
use uuid::Uuid;

/// Best-effort push to a connected client. The delivery transport (socket
/// server, push provider) is an external collaborator; this surface only
/// guarantees the emit never fails the business operation that fired it.
#[derive(Debug, Clone, Default)]
pub struct RealtimeService;

impl RealtimeService {
    pub fn new() -> Self {
        Self
    }

    pub fn emit_to_user(&self, user_id: Uuid, event_name: &str, payload: &Value) {
        // Transport hand-off point. Until a socket layer is wired in, the
        // emit is traced so event flow stays observable in development.
        tracing::debug!(
            "Realtime emit to {}: {} {}",
            user_id,
            event_name,
            payload
        );
    }
}
