use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::api::error::ApiError;
use crate::api::transport::{ApiRequest, Body, HttpTransport, Method, Transport};
use crate::config::AppConfig;
use crate::models::{Record, Resource, Session};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Values to create or update a record with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub fields: BTreeMap<String, String>,
    /// Form field name and local file.
    pub image: Option<(String, PathBuf)>,
}

impl Payload {
    fn json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }

    fn multipart(&self, method_override: Option<&str>) -> Body {
        let mut fields: Vec<(String, String)> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(method) = method_override {
            fields.push(("_method".to_string(), method.to_string()));
        }
        Body::Multipart {
            fields,
            files: self.image.iter().cloned().collect(),
        }
    }
}

pub struct ApiClient<T: Transport> {
    transport: T,
    token: Option<String>,
    max_upload_bytes: u64,
}

impl ApiClient<HttpTransport> {
    pub fn from_config(config: &AppConfig, session: Option<&Session>) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(
            &config.api.base_url,
            config.api.timeout_seconds,
            &config.services.user_agent,
        )?;
        Ok(ApiClient::new(transport)
            .with_token(session.map(|s| s.token.clone()))
            .with_upload_limit_kb(config.api.max_upload_kb))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            token: None,
            max_upload_bytes: 2048 * 1024,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_upload_limit_kb(mut self, kb: u64) -> Self {
        self.max_upload_bytes = kb * 1024;
        self
    }

    fn call(&self, method: Method, path: String, body: Body) -> Result<Value, ApiError> {
        let request = ApiRequest {
            method,
            path,
            bearer: self.token.clone(),
            body,
        };
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            log::warn!(
                "{} {} failed with {}",
                request.method.as_str(),
                request.path,
                response.status
            );
            return Err(ApiError::from_response(response.status, &response.body));
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn require_token(&self) -> Result<(), ApiError> {
        if self.token.is_some() {
            Ok(())
        } else {
            Err(ApiError::NotLoggedIn)
        }
    }

    fn check_image(&self, path: &Path) -> Result<(), ApiError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ApiError::Upload(format!(
                "نوع الملف غير مدعوم: {} (المسموح: {})",
                path.display(),
                IMAGE_EXTENSIONS.join(", ")
            )));
        }
        let size = std::fs::metadata(path)
            .map_err(|e| ApiError::Upload(format!("تعذر قراءة الملف {}: {}", path.display(), e)))?
            .len();
        if size > self.max_upload_bytes {
            return Err(ApiError::Upload(format!(
                "حجم الصورة أكبر من المسموح ({} كيلوبايت)",
                self.max_upload_bytes / 1024
            )));
        }
        Ok(())
    }

    // ─── Collections ─────────────────────────────────────────────────────────

    pub fn list(&self, resource: Resource) -> Result<Vec<Record>, ApiError> {
        let value = self.call(Method::Get, resource.path().to_string(), Body::Empty)?;
        let items = unwrap_list(value)
            .ok_or_else(|| ApiError::Decode(format!("{} list is not an array", resource)))?;
        serde_json::from_value(items).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Active records only, as shown on the public site.
    pub fn list_public(&self, resource: Resource) -> Result<Vec<Record>, ApiError> {
        Ok(self
            .list(resource)?
            .into_iter()
            .filter(|r| r.status)
            .collect())
    }

    pub fn get(&self, resource: Resource, id: i64) -> Result<Record, ApiError> {
        let value = self.call(Method::Get, item_path(resource, id), Body::Empty)?;
        unwrap_record(value)
            .ok_or_else(|| ApiError::Decode(format!("{} #{} is not a record", resource, id)))
    }

    /// The created record when the server echoes it back.
    pub fn create(&self, resource: Resource, payload: &Payload) -> Result<Option<Record>, ApiError> {
        self.require_token()?;
        let body = match &payload.image {
            Some((_, path)) => {
                self.check_image(path)?;
                payload.multipart(None)
            }
            None => Body::Json(payload.json()),
        };
        let value = self.call(Method::Post, resource.path().to_string(), body)?;
        Ok(unwrap_record(value))
    }

    /// JSON PATCH, or multipart POST with a `_method=PATCH` override when an image is attached.
    pub fn update(
        &self,
        resource: Resource,
        id: i64,
        payload: &Payload,
    ) -> Result<Option<Record>, ApiError> {
        self.require_token()?;
        let (method, body) = match &payload.image {
            Some((_, path)) => {
                self.check_image(path)?;
                (Method::Post, payload.multipart(Some("PATCH")))
            }
            None => (Method::Patch, Body::Json(payload.json())),
        };
        let value = self.call(method, item_path(resource, id), body)?;
        Ok(unwrap_record(value))
    }

    pub fn delete(&self, resource: Resource, id: i64) -> Result<(), ApiError> {
        self.require_token()?;
        self.call(Method::Delete, item_path(resource, id), Body::Empty)?;
        Ok(())
    }

    pub fn set_status(&self, resource: Resource, id: i64, active: bool) -> Result<(), ApiError> {
        self.require_token()?;
        self.call(
            Method::Patch,
            format!("{}/status", item_path(resource, id)),
            Body::Json(json!({ "status": u8::from(active) })),
        )?;
        Ok(())
    }

    // ─── Auth ────────────────────────────────────────────────────────────────

    /// Returns the bearer token and the user object.
    pub fn login(&self, email: &str, password: &str) -> Result<(String, Value), ApiError> {
        let value = self.call(
            Method::Post,
            "/login/API".to_string(),
            Body::Json(json!({ "email": email, "password": password })),
        )?;
        let inner = match value.get("data") {
            Some(data) if data.is_object() => data.clone(),
            _ => value,
        };
        let token = ["token", "access_token"]
            .iter()
            .find_map(|k| inner.get(*k).and_then(Value::as_str))
            .ok_or_else(|| ApiError::Decode("login response has no token".into()))?
            .to_string();
        let user = inner.get("user").cloned().unwrap_or(Value::Null);
        Ok((token, user))
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.require_token()?;
        self.call(Method::Post, "/logout".to_string(), Body::Empty)?;
        Ok(())
    }
}

fn item_path(resource: Resource, id: i64) -> String {
    format!("{}/{}", resource.path(), id)
}

/// Accepts a bare array, `{data: [...]}` or a paginated `{data: {data: [...]}}`.
fn unwrap_list(value: Value) -> Option<Value> {
    match value {
        Value::Array(_) => Some(value),
        Value::Object(mut map) => match map.remove("data")? {
            Value::Array(items) => Some(Value::Array(items)),
            inner @ Value::Object(_) => unwrap_list(inner),
            _ => None,
        },
        _ => None,
    }
}

fn unwrap_record(value: Value) -> Option<Record> {
    if let Some(data) = value.get("data") {
        if let Ok(record) = serde_json::from_value::<Record>(data.clone()) {
            return Some(record);
        }
    }
    serde_json::from_value(value).ok()
}
