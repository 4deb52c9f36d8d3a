use clap::ValueEnum;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Back-office collections exposed by the organization's API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Resource {
    News,
    #[value(alias = "donate")]
    Donations,
    #[value(alias = "geniuse")]
    Geniuses,
    Sections,
    Directors,
    #[value(name = "home", alias = "home-media")]
    HomeMedia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    LongText,
    Number,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field(name: &'static str, label: &'static str, kind: FieldKind, required: bool) -> FieldSpec {
    FieldSpec { name, label, kind, required }
}

const NEWS_FIELDS: &[FieldSpec] = &[
    field("title", "العنوان", FieldKind::Text, true),
    field("content", "المحتوى", FieldKind::LongText, true),
    field("image", "الصورة", FieldKind::Image, false),
];

const DONATION_FIELDS: &[FieldSpec] = &[
    field("title", "العنوان", FieldKind::Text, true),
    field("description", "الوصف", FieldKind::LongText, true),
    field("account_number", "رقم الحساب", FieldKind::Text, false),
    field("image", "الصورة", FieldKind::Image, false),
];

const GENIUS_FIELDS: &[FieldSpec] = &[
    field("name", "الاسم", FieldKind::Text, true),
    field("grade", "الصف", FieldKind::Text, true),
    field("score", "المعدل", FieldKind::Number, false),
    field("description", "نبذة", FieldKind::LongText, false),
    field("image", "الصورة", FieldKind::Image, true),
];

const SECTION_FIELDS: &[FieldSpec] = &[
    field("name", "اسم القسم", FieldKind::Text, true),
    field("description", "الوصف", FieldKind::LongText, true),
    field("image", "الصورة", FieldKind::Image, false),
];

const DIRECTOR_FIELDS: &[FieldSpec] = &[
    field("name", "الاسم", FieldKind::Text, true),
    field("position", "المنصب", FieldKind::Text, true),
    field("description", "نبذة", FieldKind::LongText, false),
    field("image", "الصورة", FieldKind::Image, false),
];

const HOME_MEDIA_FIELDS: &[FieldSpec] = &[
    field("title", "العنوان", FieldKind::Text, true),
    field("image", "الصورة", FieldKind::Image, true),
];

impl Resource {
    pub fn all() -> [Resource; 6] {
        [
            Resource::News,
            Resource::Donations,
            Resource::Geniuses,
            Resource::Sections,
            Resource::Directors,
            Resource::HomeMedia,
        ]
    }

    /// Collection path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Resource::News => "/news",
            Resource::Donations => "/donate/API",
            Resource::Geniuses => "/geniuse/API",
            Resource::Sections => "/sections/API",
            Resource::Directors => "/directors",
            Resource::HomeMedia => "/home/API",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Resource::News => "News",
            Resource::Donations => "Donations",
            Resource::Geniuses => "Geniuses",
            Resource::Sections => "Sections",
            Resource::Directors => "Directors",
            Resource::HomeMedia => "Home media",
        }
    }

    pub fn arabic_name(&self) -> &'static str {
        match self {
            Resource::News => "الأخبار",
            Resource::Donations => "التبرعات",
            Resource::Geniuses => "المتفوقون",
            Resource::Sections => "الأقسام",
            Resource::Directors => "المدراء",
            Resource::HomeMedia => "وسائط الصفحة الرئيسية",
        }
    }

    /// Field shown as the row title in lists.
    pub fn title_field(&self) -> &'static str {
        match self {
            Resource::News | Resource::Donations | Resource::HomeMedia => "title",
            Resource::Geniuses | Resource::Sections | Resource::Directors => "name",
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Resource::News => NEWS_FIELDS,
            Resource::Donations => DONATION_FIELDS,
            Resource::Geniuses => GENIUS_FIELDS,
            Resource::Sections => SECTION_FIELDS,
            Resource::Directors => DIRECTOR_FIELDS,
            Resource::HomeMedia => HOME_MEDIA_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Sections of the public site; donations, geniuses and directors are back-office only.
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Resource::News | Resource::Sections | Resource::HomeMedia
        )
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One item of any collection. Fields other than `id` and `status` are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "de_id")]
    pub id: i64,
    /// Collections that carry no status column are always published.
    #[serde(default = "active", deserialize_with = "de_status", serialize_with = "ser_status")]
    pub status: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn title(&self, resource: Resource) -> String {
        self.text(resource.title_field())
            .unwrap_or_else(|| format!("#{}", self.id))
    }

    pub fn status_label(&self) -> &'static str {
        if self.status { "active" } else { "inactive" }
    }
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("invalid id: {}", n))),
        Value::String(s) => s
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid id: {}", s))),
        other => Err(de::Error::custom(format!("invalid id: {}", other))),
    }
}

fn active() -> bool {
    true
}

fn de_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        Value::String(s) => matches!(
            s.to_lowercase().as_str(),
            "1" | "true" | "active" | "enabled" | "published"
        ),
        _ => false,
    })
}

fn ser_status<S: Serializer>(status: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_normalized_from_mixed_encodings() {
        let raw = r#"[
            {"id": 1, "status": 1, "title": "a"},
            {"id": "2", "status": "0", "title": "b"},
            {"id": 3, "status": true, "title": "c"},
            {"id": 4, "status": "active", "title": "d"},
            {"id": 5, "title": "e"},
            {"id": 6, "status": null, "title": "f"}
        ]"#;
        let records: Vec<Record> = serde_json::from_str(raw).unwrap();
        let statuses: Vec<bool> = records.iter().map(|r| r.status).collect();
        // A missing status counts as active; an explicit null does not.
        assert_eq!(statuses, vec![true, false, true, true, true, false]);
        assert_eq!(records[1].id, 2);
    }

    #[test]
    fn extra_fields_are_kept_and_status_serializes_as_int() {
        let record: Record =
            serde_json::from_str(r#"{"id": 7, "status": 1, "name": "Ali", "score": 98}"#).unwrap();
        assert_eq!(record.title(Resource::Geniuses), "Ali");
        assert_eq!(record.text("score").as_deref(), Some("98"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["status"], 1);
        assert_eq!(back["name"], "Ali");
    }

    #[test]
    fn title_falls_back_to_id() {
        let record: Record = serde_json::from_str(r#"{"id": 9}"#).unwrap();
        assert_eq!(record.title(Resource::News), "#9");
    }

    #[test]
    fn every_resource_has_its_title_field() {
        for resource in Resource::all() {
            let spec = resource.field(resource.title_field()).unwrap();
            assert!(spec.required);
        }
    }
}
