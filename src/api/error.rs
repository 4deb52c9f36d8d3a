use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },
    #[error("unauthorized")]
    Unauthorized,
    #[error("server responded {status}: {message}")]
    Server { status: u16, message: String },
    #[error("no response from server: {0}")]
    Connectivity(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("{0}")]
    Upload(String),
    #[error("not logged in")]
    NotLoggedIn,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, FieldMessages>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldMessages {
    Many(Vec<String>),
    One(String),
}

impl From<FieldMessages> for Vec<String> {
    fn from(m: FieldMessages) -> Self {
        match m {
            FieldMessages::Many(v) => v,
            FieldMessages::One(s) => vec![s],
        }
    }
}

impl ApiError {
    /// Classify a non-success HTTP response.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed.message.unwrap_or_default();
        match status {
            401 => ApiError::Unauthorized,
            422 => ApiError::Validation {
                message,
                fields: parsed
                    .errors
                    .into_iter()
                    .map(|(k, v)| (k, v.into()))
                    .collect(),
            },
            _ => ApiError::Server { status, message },
        }
    }

    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            ApiError::Validation { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Text shown to the user in banners.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation { message, fields } => {
                let first: Vec<&str> = fields
                    .values()
                    .filter_map(|msgs| msgs.first().map(String::as_str))
                    .collect();
                if !first.is_empty() {
                    first.join("، ")
                } else if !message.is_empty() {
                    message.clone()
                } else {
                    "يرجى التحقق من البيانات المدخلة".to_string()
                }
            }
            ApiError::Unauthorized => "البريد الإلكتروني أو كلمة المرور غير صحيحة".to_string(),
            ApiError::Server { .. } => "حدث خطأ أثناء معالجة الطلب، حاول مرة أخرى".to_string(),
            ApiError::Connectivity(_) => {
                "تعذر الاتصال بالخادم، تحقق من اتصالك بالإنترنت".to_string()
            }
            ApiError::Decode(_) => "استجابة غير متوقعة من الخادم".to_string(),
            ApiError::Upload(reason) => reason.clone(),
            ApiError::NotLoggedIn => "يجب تسجيل الدخول أولاً".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprocessable_entity_keeps_field_messages() {
        let body = r#"{"message": "The title field is required.",
                       "errors": {"title": ["حقل العنوان مطلوب"], "image": "الصورة كبيرة"}}"#;
        let err = ApiError::from_response(422, body);
        let fields = err.field_errors().unwrap();
        assert_eq!(fields["title"], vec!["حقل العنوان مطلوب"]);
        assert_eq!(fields["image"], vec!["الصورة كبيرة"]);
        assert_eq!(err.user_message(), "الصورة كبيرة، حقل العنوان مطلوب");
    }

    #[test]
    fn validation_without_fields_uses_message() {
        let err = ApiError::from_response(422, r#"{"message": "Invalid data"}"#);
        assert_eq!(err.user_message(), "Invalid data");
        let err = ApiError::from_response(422, "not json");
        assert_eq!(err.user_message(), "يرجى التحقق من البيانات المدخلة");
    }

    #[test]
    fn statuses_map_to_taxonomy() {
        assert_eq!(ApiError::from_response(401, ""), ApiError::Unauthorized);
        assert!(matches!(
            ApiError::from_response(500, r#"{"message": "boom"}"#),
            ApiError::Server { status: 500, ref message } if message == "boom"
        ));
        assert!(matches!(
            ApiError::from_response(404, "<html>"),
            ApiError::Server { status: 404, .. }
        ));
    }

    #[test]
    fn server_and_connectivity_messages_are_generic() {
        let server = ApiError::Server { status: 500, message: "stack trace".into() };
        assert!(!server.user_message().contains("stack"));
        let offline = ApiError::Connectivity("dns".into());
        assert!(offline.user_message().contains("تعذر الاتصال"));
    }
}
