use crate::api::transport::Transport;
use crate::api::{ApiClient, ApiError};
use crate::models::{Fetch, Record, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// Transient outcome message shown above a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl Banner {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: BannerKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: BannerKind::Error, message: message.into() }
    }
}

/// State of one back-office collection screen.
pub struct ListScreen {
    pub resource: Resource,
    pub records: Fetch<Vec<Record>>,
    pub banner: Option<Banner>,
    pub selected: usize,
}

impl ListScreen {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            records: Fetch::Loading,
            banner: None,
            selected: 0,
        }
    }

    pub fn refresh<T: Transport>(&mut self, client: &ApiClient<T>) {
        self.records = match client.list(self.resource) {
            Ok(records) => Fetch::Ready(records),
            Err(e) => {
                log::warn!("Loading {} failed: {}", self.resource, e);
                Fetch::Failed(e.user_message())
            }
        };
        let len = self.records.ready().map_or(0, Vec::len);
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.records.ready()?.get(self.selected)
    }

    pub fn select_next(&mut self) {
        let len = self.records.ready().map_or(0, Vec::len);
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Flip one record's status locally, then on the server; the local flip is
    /// undone when the server rejects it.
    pub fn toggle_status<T: Transport>(
        &mut self,
        client: &ApiClient<T>,
        id: i64,
    ) -> Result<bool, ApiError> {
        let resource = self.resource;
        let Some(record) = self
            .records
            .ready_mut()
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
        else {
            let err = ApiError::Decode(format!("{} #{} is not loaded", resource, id));
            self.banner = Some(Banner::error(err.user_message()));
            return Err(err);
        };

        record.status = !record.status;
        let new_status = record.status;

        match client.set_status(resource, id, new_status) {
            Ok(()) => {
                self.banner = Some(Banner::success("تم تحديث الحالة بنجاح"));
                Ok(new_status)
            }
            Err(e) => {
                if let Some(record) = self
                    .records
                    .ready_mut()
                    .and_then(|records| records.iter_mut().find(|r| r.id == id))
                {
                    record.status = !new_status;
                }
                self.banner = Some(Banner::error(e.user_message()));
                Err(e)
            }
        }
    }

    pub fn delete<T: Transport>(&mut self, client: &ApiClient<T>, id: i64) -> Result<(), ApiError> {
        match client.delete(self.resource, id) {
            Ok(()) => {
                if let Some(records) = self.records.ready_mut() {
                    records.retain(|r| r.id != id);
                    self.selected = self.selected.min(records.len().saturating_sub(1));
                }
                self.banner = Some(Banner::success("تم الحذف بنجاح"));
                Ok(())
            }
            Err(e) => {
                self.banner = Some(Banner::error(e.user_message()));
                Err(e)
            }
        }
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::{Body, Method};
    use crate::api::transport::fake::FakeTransport;
    use serde_json::json;

    const LIST: &str = r#"[
        {"id": 1, "status": 1, "title": "a"},
        {"id": 2, "status": 0, "title": "b"},
        {"id": 3, "status": 1, "title": "c"}
    ]"#;

    fn statuses(screen: &ListScreen) -> Vec<bool> {
        screen.records.ready().unwrap().iter().map(|r| r.status).collect()
    }

    #[test]
    fn refresh_sets_lifecycle_state() {
        let fake = FakeTransport::default().respond(200, LIST).respond(500, "");
        let client = ApiClient::new(&fake);
        let mut screen = ListScreen::new(Resource::News);
        assert!(screen.records.is_loading());

        screen.refresh(&client);
        assert_eq!(screen.records.ready().unwrap().len(), 3);

        screen.refresh(&client);
        assert!(matches!(screen.records, Fetch::Failed(_)));
    }

    #[test]
    fn toggle_flips_exactly_one_record() {
        let fake = FakeTransport::default().respond(200, LIST).respond(200, "{}");
        let client = ApiClient::new(&fake).with_token(Some("t".into()));
        let mut screen = ListScreen::new(Resource::News);
        screen.refresh(&client);

        assert_eq!(screen.toggle_status(&client, 2), Ok(true));
        assert_eq!(statuses(&screen), vec![true, true, true]);

        let req = fake.last();
        assert_eq!(req.method, Method::Patch);
        assert_eq!(req.path, "/news/2/status");
        assert_eq!(req.body, Body::Json(json!({"status": 1})));
        assert_eq!(screen.banner.as_ref().unwrap().kind, BannerKind::Success);
    }

    #[test]
    fn rejected_toggle_is_reverted() {
        let fake = FakeTransport::default().respond(200, LIST).fail();
        let client = ApiClient::new(&fake).with_token(Some("t".into()));
        let mut screen = ListScreen::new(Resource::News);
        screen.refresh(&client);

        assert!(screen.toggle_status(&client, 1).is_err());
        assert_eq!(statuses(&screen), vec![true, false, true]);
        let banner = screen.banner.as_ref().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert!(banner.message.contains("تعذر الاتصال"));
    }

    #[test]
    fn toggling_an_unknown_id_sends_nothing() {
        let fake = FakeTransport::default().respond(200, LIST);
        let client = ApiClient::new(&fake).with_token(Some("t".into()));
        let mut screen = ListScreen::new(Resource::News);
        screen.refresh(&client);
        assert!(screen.toggle_status(&client, 99).is_err());
        assert_eq!(fake.count(), 1);
        assert_eq!(statuses(&screen), vec![true, false, true]);
    }

    #[test]
    fn delete_removes_the_row_and_keeps_selection_in_range() {
        let fake = FakeTransport::default().respond(200, LIST).respond(204, "");
        let client = ApiClient::new(&fake).with_token(Some("t".into()));
        let mut screen = ListScreen::new(Resource::News);
        screen.refresh(&client);
        screen.select_next();
        screen.select_next();
        screen.select_next();
        assert_eq!(screen.selected, 2);

        screen.delete(&client, 3).unwrap();
        let ids: Vec<i64> = screen.records.ready().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(screen.selected, 1);
        assert_eq!(screen.selected_record().unwrap().id, 2);
    }
}
