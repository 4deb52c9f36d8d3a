use anyhow::Result;
use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::api::transport::Transport;
use crate::api::{ApiClient, ApiError};
use crate::config::AppConfig;
use crate::db::repository::SessionRepo;
use crate::models::Session;

pub fn session_ttl(config: &AppConfig) -> Duration {
    Duration::hours(config.api.session_ttl_hours.max(1))
}

/// The stored session, if one exists and has not expired.
pub fn current_session(conn: &Connection, config: &AppConfig) -> Result<Option<Session>> {
    SessionRepo::load(conn, Utc::now(), session_ttl(config))
}

/// Authenticate and store the session. Credential errors are returned untouched
/// so callers can show the matching message.
pub fn login<T: Transport>(
    conn: &Connection,
    client: &ApiClient<T>,
    email: &str,
    password: &str,
    remember: bool,
) -> Result<Session, ApiError> {
    let (token, user) = client.login(email.trim(), password)?;
    let session = Session::new(token, user, remember);
    SessionRepo::store(conn, &session).map_err(|e| ApiError::Decode(e.to_string()))?;
    log::info!(
        "Logged in as {} ({})",
        session.user_label(),
        if remember { "remembered" } else { "temporary" }
    );
    Ok(session)
}

/// Tell the server, then forget the session locally whatever the server said.
pub fn logout<T: Transport>(conn: &Connection, client: &ApiClient<T>) -> Result<Option<ApiError>> {
    let server = match client.logout() {
        Ok(()) => None,
        Err(e) => {
            log::warn!("Server logout failed: {}", e);
            Some(e)
        }
    };
    SessionRepo::clear(conn)?;
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::fake::FakeTransport;
    use crate::db::migrations::test_conn;

    #[test]
    fn login_persists_session() {
        let conn = test_conn();
        let fake = FakeTransport::default().respond(200, r#"{"token": "abc", "user": {"name": "Admin"}}"#);
        let session = login(&conn, &ApiClient::new(&fake), " admin@school.example ", "pw", true).unwrap();
        assert_eq!(session.token, "abc");

        let stored = current_session(&conn, &AppConfig::default()).unwrap().unwrap();
        assert_eq!(stored.token, "abc");
        assert!(stored.remember);
        assert_eq!(
            fake.last().body,
            crate::api::transport::Body::Json(
                serde_json::json!({"email": "admin@school.example", "password": "pw"})
            )
        );
    }

    #[test]
    fn failed_login_stores_nothing() {
        let conn = test_conn();
        let fake = FakeTransport::default().respond(401, "");
        let err = login(&conn, &ApiClient::new(&fake), "a", "b", false).unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
        assert!(current_session(&conn, &AppConfig::default()).unwrap().is_none());
    }

    #[test]
    fn logout_clears_even_when_server_fails() {
        let conn = test_conn();
        SessionRepo::store(&conn, &Session::new("abc".into(), serde_json::json!({}), true)).unwrap();
        let fake = FakeTransport::default().fail();
        let client = ApiClient::new(&fake).with_token(Some("abc".into()));

        let server_error = logout(&conn, &client).unwrap();
        assert!(matches!(server_error, Some(ApiError::Connectivity(_))));
        assert!(current_session(&conn, &AppConfig::default()).unwrap().is_none());
        assert_eq!(fake.last().path, "/logout");
    }
}
