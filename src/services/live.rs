use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::models::attendance::AttendanceStatus;

/// Publishes a live update for one marked attendance to any dashboards
/// subscribed to the session's channel.
///
/// Fire-and-forget: failures are logged and swallowed, the stored record is
/// already durable and no listener acknowledgement is expected.
pub async fn publish_attendance_update(
    mut redis: ConnectionManager,
    session_id: Uuid,
    student_name: &str,
    status: AttendanceStatus,
) {
    let channel = format!("live:session:{}", session_id);
    let payload = sonic_rs::to_string(&sonic_rs::json!({
        "sessionId": session_id.to_string(),
        "studentName": student_name,
        "status": status.as_str(),
    }))
    .unwrap_or_default();

    let result: redis::RedisResult<i64> = redis.publish(&channel, payload).await;
    match result {
        Ok(receivers) => {
            tracing::debug!("📡 Live update published to {} ({} receivers)", channel, receivers);
        }
        Err(e) => {
            tracing::warn!("Live update publish failed for {}: {}", channel, e);
        }
    }
}

/// Publishes a session lifecycle notification (started/ended).
pub async fn publish_session_event(mut redis: ConnectionManager, event: &str, session_id: Uuid) {
    let payload = sonic_rs::to_string(&sonic_rs::json!({
        "event": event,
        "sessionId": session_id.to_string(),
    }))
    .unwrap_or_default();

    let result: redis::RedisResult<i64> = redis.publish("live:sessions", payload).await;
    if let Err(e) = result {
        tracing::warn!("Session event publish failed: {}", e);
    }
}
