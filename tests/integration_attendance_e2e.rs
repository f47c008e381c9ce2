use std::net::TcpStream;
use std::time::{SystemTime, UNIX_EPOCH};

// Shared test context
struct TestContext {
    client: reqwest::Client,
    base_url: String,
}

impl TestContext {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://127.0.0.1:5000".to_string(),
        }
    }

    fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }
}

/// These tests need the server (plus Postgres and Redis) running locally.
fn server_available() -> bool {
    TcpStream::connect("127.0.0.1:5000").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn register(
        context: &TestContext,
        name: &str,
        email: &str,
        role: &str,
    ) -> (String, Value) {
        let response = context
            .client
            .post(format!("{}/api/auth/register", context.base_url))
            .json(&json!({
                "name": name,
                "email": email,
                "password": "SecurePass123!",
                "role": role,
                "consent_accepted": true
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 201, "Registration failed");
        let body: Value = response.json().await.unwrap();
        (body["token"].as_str().unwrap().to_string(), body)
    }

    async fn start_session(context: &TestContext, faculty_token: &str) -> Value {
        let response = context
            .client
            .post(format!("{}/api/session/start", context.base_url))
            .bearer_auth(faculty_token)
            .json(&json!({
                "course_id": "CS-101",
                "verification_rules": {
                    "face": true,
                    "fingerprint": false,
                    "id_card": true,
                    "liveness": true
                }
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 201, "Session start failed");
        response.json().await.unwrap()
    }

    #[tokio::test]
    async fn test_verify_marks_and_rejects_resubmission() {
        if !server_available() {
            eprintln!("skipping e2e test: server not running on 127.0.0.1:5000");
            return;
        }

        let context = TestContext::new();
        let timestamp = TestContext::get_timestamp();

        let (faculty_token, _) = register(
            &context,
            "Prof Test",
            &format!("faculty_{}@example.edu", timestamp),
            "faculty",
        )
        .await;

        let (student_token, _) = register(
            &context,
            "Student Test",
            &format!("student_{}@example.edu", timestamp),
            "student",
        )
        .await;

        let session = start_session(&context, &faculty_token).await;
        let session_id = session["id"].as_str().unwrap();
        let qr_token = session["qr_token"].as_str().unwrap();

        // Wrong token: one failing factor, FAILED, success=false.
        let face_vector: Vec<f64> = vec![0.5; 128];
        let response = context
            .client
            .post(format!("{}/api/attendance/verify", context.base_url))
            .bearer_auth(&student_token)
            .json(&json!({
                "session_id": session_id,
                "face_vector": face_vector,
                "qr_token": "WRONG1",
                "blink_count": 2
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], "FAILED");
        assert_eq!(body["attempts"], 1);
        assert_eq!(body["anomalies"][0], "Invalid Session Token");

        // Correct submission. The seeded profile vector sits around 75%
        // similarity against a flat capture, above the relaxed threshold,
        // and the lenient token policy accepts the lowercased token.
        let response = context
            .client
            .post(format!("{}/api/attendance/verify", context.base_url))
            .bearer_auth(&student_token)
            .json(&json!({
                "session_id": session_id,
                "face_vector": face_vector,
                "qr_token": qr_token.to_lowercase(),
                "blink_count": 2
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "MARKED");
        assert_eq!(body["attempts"], 2);

        // Resubmission after MARKED is rejected outright.
        let response = context
            .client
            .post(format!("{}/api/attendance/verify", context.base_url))
            .bearer_auth(&student_token)
            .json(&json!({
                "session_id": session_id,
                "face_vector": face_vector,
                "qr_token": qr_token,
                "blink_count": 2
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 409);

        // Faculty report shows the marked record.
        let response = context
            .client
            .get(format!(
                "{}/api/attendance/session/{}",
                context.base_url, session_id
            ))
            .bearer_auth(&faculty_token)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let report: Value = response.json().await.unwrap();
        assert_eq!(report["count"], 1);
        assert_eq!(report["attendance"][0]["status"], "MARKED");
        assert_eq!(report["attendance"][0]["attempts"], 2);

        // The student's own history includes the marked session.
        let response = context
            .client
            .get(format!("{}/api/attendance/my", context.base_url))
            .bearer_auth(&student_token)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let history: Value = response.json().await.unwrap();
        assert!(history["attendance"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["session"]["id"].as_str() == Some(session_id)
                && r["status"] == "MARKED"
                && r["session"]["course_id"] == "CS-101"));

        // The faculty anomaly trail carries the failed first attempt.
        let response = context
            .client
            .get(format!("{}/api/attendance/anomalies", context.base_url))
            .bearer_auth(&faculty_token)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let trail: Value = response.json().await.unwrap();
        assert!(trail["anomalies"]
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a["session"]["id"].as_str() == Some(session_id)
                && a["reason"] == "Invalid Session Token"
                && a["severity"] == "LOW"));

        // Students may not read the anomaly trail.
        let response = context
            .client
            .get(format!("{}/api/attendance/anomalies", context.base_url))
            .bearer_auth(&student_token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 403);

        // Faculty may not read a student history.
        let response = context
            .client
            .get(format!("{}/api/attendance/my", context.base_url))
            .bearer_auth(&faculty_token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 403);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_attempts() {
        if !server_available() {
            eprintln!("skipping e2e test: server not running on 127.0.0.1:5000");
            return;
        }

        let context = TestContext::new();
        let timestamp = TestContext::get_timestamp();

        let (faculty_token, _) = register(
            &context,
            "Prof Closer",
            &format!("closer_{}@example.edu", timestamp),
            "faculty",
        )
        .await;

        let (student_token, _) = register(
            &context,
            "Student Late",
            &format!("late_{}@example.edu", timestamp),
            "student",
        )
        .await;

        let session = start_session(&context, &faculty_token).await;
        let session_id = session["id"].as_str().unwrap();

        let response = context
            .client
            .patch(format!(
                "{}/api/session/end/{}",
                context.base_url, session_id
            ))
            .bearer_auth(&faculty_token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);

        let response = context
            .client
            .post(format!("{}/api/attendance/verify", context.base_url))
            .bearer_auth(&student_token)
            .json(&json!({
                "session_id": session_id,
                "face_vector": vec![0.5; 128],
                "qr_token": session["qr_token"],
                "blink_count": 2
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Session is closed or not found");
    }
}
