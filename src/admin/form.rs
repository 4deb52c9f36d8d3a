use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::api::{ApiClient, ApiError, Payload};
use crate::api::transport::Transport;
use crate::models::{FieldKind, Record, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update(i64),
}

/// Editable values for one record. Errors never clear values.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub resource: Resource,
    pub mode: FormMode,
    pub values: BTreeMap<String, String>,
    pub image: Option<PathBuf>,
    pub errors: BTreeMap<String, String>,
}

impl Form {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            mode: FormMode::Create,
            values: BTreeMap::new(),
            image: None,
            errors: BTreeMap::new(),
        }
    }

    /// Pre-filled from an existing record; the image stays on the server unless replaced.
    pub fn edit(resource: Resource, record: &Record) -> Self {
        let values = resource
            .fields()
            .iter()
            .filter(|f| f.kind != FieldKind::Image)
            .filter_map(|f| record.text(f.name).map(|v| (f.name.to_string(), v)))
            .collect();
        Self {
            resource,
            mode: FormMode::Update(record.id),
            values,
            image: None,
            errors: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let spec = self.resource.field(name).ok_or_else(|| {
            let known: Vec<&str> = self.resource.fields().iter().map(|f| f.name).collect();
            anyhow!(
                "{} has no field '{}' (fields: {})",
                self.resource,
                name,
                known.join(", ")
            )
        })?;
        if spec.kind == FieldKind::Image {
            self.image = Some(PathBuf::from(value));
        } else {
            self.values.insert(name.to_string(), value.to_string());
        }
        self.errors.remove(name);
        Ok(())
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    /// Check required and numeric fields. Returns true when the form can be sent.
    pub fn validate(&mut self) -> bool {
        self.errors.clear();
        for spec in self.resource.fields() {
            let message = match spec.kind {
                FieldKind::Image => {
                    let needed = spec.required && self.mode == FormMode::Create;
                    (needed && self.image.is_none()).then(|| format!("حقل {} مطلوب", spec.label))
                }
                _ => {
                    let value = self.value(spec.name).map(str::trim).unwrap_or_default();
                    if spec.required && value.is_empty() {
                        Some(format!("حقل {} مطلوب", spec.label))
                    } else if spec.kind == FieldKind::Number
                        && !value.is_empty()
                        && value.parse::<f64>().is_err()
                    {
                        Some(format!("يجب أن يكون {} رقماً", spec.label))
                    } else {
                        None
                    }
                }
            };
            if let Some(message) = message {
                self.errors.insert(spec.name.to_string(), message);
            }
        }
        self.errors.is_empty()
    }

    /// Merge server-side field errors. Returns false when `err` carries none.
    pub fn apply_server_errors(&mut self, err: &ApiError) -> bool {
        let Some(fields) = err.field_errors() else {
            return false;
        };
        for (name, messages) in fields {
            if let Some(first) = messages.first() {
                self.errors.insert(name.clone(), first.clone());
            }
        }
        !fields.is_empty()
    }

    pub fn payload(&self) -> Payload {
        let image_field = self
            .resource
            .fields()
            .iter()
            .find(|f| f.kind == FieldKind::Image)
            .map(|f| f.name)
            .unwrap_or("image");
        Payload {
            fields: self.values.clone(),
            image: self
                .image
                .clone()
                .map(|path| (image_field.to_string(), path)),
        }
    }

    /// Validate locally, then create or update. Field errors from either side land in `errors`.
    pub fn submit<T: Transport>(&mut self, client: &ApiClient<T>) -> Result<Option<Record>, ApiError> {
        if !self.validate() {
            return Err(ApiError::Validation {
                message: String::new(),
                fields: self
                    .errors
                    .iter()
                    .map(|(k, v)| (k.clone(), vec![v.clone()]))
                    .collect(),
            });
        }
        let payload = self.payload();
        let result = match self.mode {
            FormMode::Create => client.create(self.resource, &payload),
            FormMode::Update(id) => client.update(self.resource, id, &payload),
        };
        if let Err(e) = &result {
            self.apply_server_errors(e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::fake::FakeTransport;

    #[test]
    fn missing_required_field_keeps_other_values() {
        let mut form = Form::new(Resource::Sections);
        form.set("description", "قسم العلوم").unwrap();
        assert!(!form.validate());

        assert_eq!(form.error("name"), Some("حقل اسم القسم مطلوب"));
        assert_eq!(form.error("description"), None);
        assert_eq!(form.value("description"), Some("قسم العلوم"));
    }

    #[test]
    fn whitespace_does_not_satisfy_required() {
        let mut form = Form::new(Resource::News);
        form.set("title", "   ").unwrap();
        form.set("content", "x").unwrap();
        assert!(!form.validate());
        assert!(form.error("title").is_some());
    }

    #[test]
    fn required_image_only_on_create() {
        let mut form = Form::new(Resource::HomeMedia);
        form.set("title", "banner").unwrap();
        assert!(!form.validate());
        assert!(form.error("image").is_some());

        form.set("image", "/tmp/banner.png").unwrap();
        assert!(form.validate());

        let record: Record = serde_json::from_str(r#"{"id": 2, "title": "banner", "image": "x.png"}"#).unwrap();
        let mut edit = Form::edit(Resource::HomeMedia, &record);
        assert_eq!(edit.value("title"), Some("banner"));
        assert_eq!(edit.value("image"), None);
        assert!(edit.validate());
    }

    #[test]
    fn numeric_fields_are_checked() {
        let mut form = Form::new(Resource::Geniuses);
        form.set("name", "Sara").unwrap();
        form.set("grade", "3").unwrap();
        form.set("image", "s.jpg").unwrap();
        form.set("score", "ninety").unwrap();
        assert!(!form.validate());
        assert!(form.error("score").unwrap().contains("رقماً"));
        form.set("score", "97.5").unwrap();
        assert!(form.validate());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut form = Form::new(Resource::News);
        assert!(form.set("colour", "red").is_err());
    }

    #[test]
    fn invalid_form_is_not_sent() {
        let fake = FakeTransport::default();
        let client = ApiClient::new(&fake).with_token(Some("t".into()));
        let mut form = Form::new(Resource::Directors);
        form.set("name", "Omar").unwrap();
        let err = form.submit(&client).unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("position"));
        assert_eq!(fake.count(), 0);
        assert_eq!(form.value("name"), Some("Omar"));
    }

    #[test]
    fn server_field_errors_are_merged_without_clearing_values() {
        let fake = FakeTransport::default()
            .respond(422, r#"{"errors": {"title": ["العنوان مستخدم من قبل"]}}"#);
        let client = ApiClient::new(&fake).with_token(Some("t".into()));
        let mut form = Form::new(Resource::News);
        form.set("title", "dup").unwrap();
        form.set("content", "body").unwrap();

        assert!(form.submit(&client).is_err());
        assert_eq!(form.error("title"), Some("العنوان مستخدم من قبل"));
        assert_eq!(form.value("title"), Some("dup"));
        assert_eq!(form.value("content"), Some("body"));
    }

    #[test]
    fn update_mode_targets_the_record() {
        let fake = FakeTransport::default().respond(200, "{}");
        let client = ApiClient::new(&fake).with_token(Some("t".into()));
        let record: Record =
            serde_json::from_str(r#"{"id": 8, "title": "old", "content": "c"}"#).unwrap();
        let mut form = Form::edit(Resource::News, &record);
        form.set("title", "new").unwrap();
        form.submit(&client).unwrap();
        assert_eq!(fake.last().path, "/news/8");
    }
}
