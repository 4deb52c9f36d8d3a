use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Value,
    pub remember: bool,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: String, user: Value, remember: bool) -> Self {
        Self {
            token,
            user,
            remember,
            created_at: Utc::now(),
        }
    }

    /// Remembered sessions never expire locally; the others last `ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.remember && now - self.created_at >= ttl
    }

    pub fn user_label(&self) -> String {
        ["name", "email", "username"]
            .iter()
            .find_map(|key| self.user.get(*key).and_then(Value::as_str))
            .unwrap_or("unknown user")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_unremembered_sessions_expire() {
        let mut session = Session::new("t".into(), json!({}), false);
        let later = session.created_at + Duration::hours(13);
        assert!(session.is_expired(later, Duration::hours(12)));
        assert!(!session.is_expired(session.created_at + Duration::hours(1), Duration::hours(12)));

        session.remember = true;
        assert!(!session.is_expired(later, Duration::hours(12)));
    }

    #[test]
    fn user_label_prefers_name() {
        let session = Session::new("t".into(), json!({"email": "a@b.c", "name": "Admin"}), true);
        assert_eq!(session.user_label(), "Admin");
        let session = Session::new("t".into(), json!({"email": "a@b.c"}), true);
        assert_eq!(session.user_label(), "a@b.c");
    }
}
