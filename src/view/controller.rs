//! Generic list view: fetch, search, paginate, create/edit/delete

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use super::filter::filter_records;
use super::paginate;
use crate::api::{ApiError, SchoolApi};
use crate::commands::{Command, CommandBus, Invalidation};
use crate::models::{FormData, Record, Resource};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Create,
    Edit(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogState {
    Closed,
    Open { mode: DialogMode, form: FormData },
    Submitting { mode: DialogMode, form: FormData },
}

pub struct ListViewController {
    resource: Resource,
    api: Arc<dyn SchoolApi>,
    bus: CommandBus,
    invalidations: broadcast::Receiver<Invalidation>,
    records: Vec<Record>,
    load_state: LoadState,
    search: String,
    page: usize,
    page_size: usize,
    selected: Option<usize>,
    dialog: DialogState,
    pending_delete: Option<i64>,
    banner: Option<String>,
    needs_login: bool,
}

impl ListViewController {
    pub fn new(bus: CommandBus, resource: Resource, page_size: usize) -> Self {
        Self {
            resource,
            api: bus.api(),
            invalidations: bus.subscribe(),
            bus,
            records: Vec::new(),
            load_state: LoadState::Idle,
            search: String::new(),
            page: 1,
            page_size: page_size.max(1),
            selected: None,
            dialog: DialogState::Closed,
            pending_delete: None,
            banner: None,
            needs_login: false,
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// Records from the last successful fetch
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Set when the backend rejected the session; the front end should log in again
    pub fn needs_login(&self) -> bool {
        self.needs_login
    }

    /// Fetch the collection. On failure the previous records stay in place.
    pub async fn refresh(&mut self) {
        self.load_state = LoadState::Loading;
        debug!("Refreshing {}", self.resource);

        match self.api.list(self.resource).await {
            Ok(records) => {
                info!("Loaded {} {}", records.len(), self.resource);
                self.records = records;
                self.load_state = LoadState::Loaded;
                self.page = paginate::clamp_page(self.page, self.filtered_len(), self.page_size);
                self.clamp_selection();
            }
            Err(e) => {
                warn!("Failed to load {}: {}", self.resource, e);
                let message = format!(
                    "Failed to load {}: {}",
                    self.resource.as_str(),
                    e.user_message()
                );
                self.record_error(&e, message.clone());
                self.load_state = LoadState::Failed(message);
            }
        }
    }

    /// Refetch if a command invalidated this collection since the last sync
    pub async fn sync(&mut self) -> bool {
        let mut stale = false;
        loop {
            match self.invalidations.try_recv() {
                Ok(invalidation) => stale |= invalidation.resource == self.resource,
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!("Missed {} invalidations, refetching {}", skipped, self.resource);
                    stale = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if stale {
            self.refresh().await;
        }
        stale
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Update the search term; the view returns to the first page
    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.page = 1;
        self.selected = if self.page_rows().is_empty() { None } else { Some(0) };
    }

    pub fn filtered(&self) -> Vec<&Record> {
        filter_records(&self.records, self.resource.search_fields(), &self.search)
    }

    fn filtered_len(&self) -> usize {
        self.filtered().len()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        paginate::total_pages(self.filtered_len(), self.page_size)
    }

    /// Rows displayed on the current page
    pub fn page_rows(&self) -> Vec<&Record> {
        let filtered = self.filtered();
        paginate::page_slice(&filtered, self.page, self.page_size).to_vec()
    }

    /// 1-based position of the first row on this page
    pub fn first_row_number(&self) -> usize {
        paginate::page_bounds(self.page, self.filtered_len(), self.page_size).0 + 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.page.saturating_sub(1));
    }

    pub fn go_to_page(&mut self, page: usize) {
        let clamped = paginate::clamp_page(page, self.filtered_len(), self.page_size);
        if clamped != self.page {
            self.page = clamped;
            self.selected = if self.page_rows().is_empty() { None } else { Some(0) };
        }
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&Record> {
        let index = self.selected?;
        self.page_rows().get(index).copied()
    }

    pub fn select_next(&mut self) {
        let rows = self.page_rows().len();
        if rows == 0 {
            self.selected = None;
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) if i + 1 < rows => i + 1,
            Some(i) => i,
            None => 0,
        });
    }

    pub fn select_prev(&mut self) {
        let rows = self.page_rows().len();
        if rows == 0 {
            self.selected = None;
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) => i.saturating_sub(1),
            None => 0,
        });
    }

    /// Select a row on the current page; out of range indexes clamp to the last row
    pub fn select(&mut self, index: Option<usize>) {
        let rows = self.page_rows().len();
        self.selected = match index {
            _ if rows == 0 => None,
            Some(i) => Some(i.min(rows - 1)),
            None => None,
        };
    }

    fn clamp_selection(&mut self) {
        let rows = self.page_rows().len();
        self.selected = match self.selected {
            _ if rows == 0 => None,
            Some(i) => Some(i.min(rows - 1)),
            None => Some(0),
        };
    }

    pub fn dialog(&self) -> &DialogState {
        &self.dialog
    }

    pub fn dialog_form_mut(&mut self) -> Option<&mut FormData> {
        match &mut self.dialog {
            DialogState::Open { form, .. } => Some(form),
            _ => None,
        }
    }

    pub fn open_create(&mut self) {
        self.dialog = DialogState::Open {
            mode: DialogMode::Create,
            form: FormData::new(),
        };
    }

    /// Open the edit dialog pre-filled from a loaded record
    pub fn open_edit(&mut self, id: i64) -> bool {
        match self.records.iter().find(|r| r.id == id) {
            Some(record) => {
                self.dialog = DialogState::Open {
                    mode: DialogMode::Edit(id),
                    form: record.to_form(self.resource),
                };
                true
            }
            None => {
                self.banner = Some(format!("{} #{} is no longer available.", self.resource.title(), id));
                false
            }
        }
    }

    pub fn close_dialog(&mut self) {
        self.dialog = DialogState::Closed;
    }

    /// Submit the open dialog. On success the dialog closes and the list is
    /// refetched; on failure the dialog stays open with the form intact.
    pub async fn submit(&mut self) -> bool {
        let (mode, form) = match std::mem::replace(&mut self.dialog, DialogState::Closed) {
            DialogState::Open { mode, form } => (mode, form),
            other => {
                self.dialog = other;
                return false;
            }
        };

        self.dialog = DialogState::Submitting {
            mode,
            form: form.clone(),
        };

        let command = match mode {
            DialogMode::Create => Command::Create {
                resource: self.resource,
                form: form.clone(),
            },
            DialogMode::Edit(id) => Command::Update {
                resource: self.resource,
                id,
                form: form.clone(),
            },
        };

        match self.bus.execute(command).await {
            Ok(_) => {
                self.dialog = DialogState::Closed;
                self.banner = None;
                self.sync().await;
                true
            }
            Err(e) => {
                self.dialog = DialogState::Open { mode, form };
                self.record_error(&e, e.user_message());
                false
            }
        }
    }

    pub fn pending_delete(&self) -> Option<i64> {
        self.pending_delete
    }

    /// Ask for confirmation before deleting
    pub fn request_delete(&mut self, id: i64) {
        self.pending_delete = Some(id);
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub async fn confirm_delete(&mut self) -> bool {
        let Some(id) = self.pending_delete.take() else {
            return false;
        };

        match self
            .bus
            .execute(Command::Delete { resource: self.resource, id })
            .await
        {
            Ok(_) => {
                self.banner = None;
                self.sync().await;
                true
            }
            Err(e) => {
                self.record_error(&e, e.user_message());
                false
            }
        }
    }

    fn record_error(&mut self, error: &ApiError, message: String) {
        if error.is_unauthorized() {
            self.needs_login = true;
        }
        self.banner = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{Failure, InMemoryApi};
    use serde_json::json;

    fn controller(api: Arc<InMemoryApi>, resource: Resource) -> ListViewController {
        ListViewController::new(CommandBus::new(api), resource, 10)
    }

    fn ids(rows: &[&Record]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn test_twenty_five_classes_paginate_into_three_pages() {
        let api = Arc::new(InMemoryApi::new());
        api.seed_named(Resource::Classes, "Class", 25);
        let mut view = controller(api, Resource::Classes);
        view.refresh().await;

        assert_eq!(view.load_state(), &LoadState::Loaded);
        assert_eq!(view.total_pages(), 3);
        assert_eq!(ids(&view.page_rows()), (1..=10).collect::<Vec<_>>());
        assert!(view.has_next());
        assert!(!view.has_prev());

        view.next_page();
        assert_eq!(view.page(), 2);
        assert!(view.has_next());

        view.next_page();
        assert_eq!(view.page(), 3);
        assert!(!view.has_next());
        assert_eq!(ids(&view.page_rows()), (21..=25).collect::<Vec<_>>());
        assert_eq!(view.first_row_number(), 21);

        view.next_page();
        assert_eq!(view.page(), 3);
        view.go_to_page(0);
        assert_eq!(view.page(), 1);
    }

    #[tokio::test]
    async fn test_rows_never_exceed_filtered_set() {
        let api = Arc::new(InMemoryApi::new());
        api.seed_named(Resource::Classes, "Class", 25);
        let mut view = controller(api, Resource::Classes);
        view.refresh().await;

        for term in ["", "class", "1", "2", "25", "class 1", "zzz", "CLASS 2"] {
            view.set_search(term);
            for page in 1..=view.total_pages() {
                view.go_to_page(page);
                let filtered = view.filtered().len();
                let rows = view.page_rows().len();
                assert!(rows <= filtered, "term {term:?} page {page}");
                assert!(rows <= view.page_size());
            }
        }

        view.set_search("class 1");
        // "Class 1" and "Class 10".."Class 19"
        assert_eq!(view.filtered().len(), 11);
        assert_eq!(view.total_pages(), 2);

        view.set_search("zzz");
        assert!(view.page_rows().is_empty());
        assert_eq!(view.total_pages(), 1);
        assert_eq!(view.selected_record(), None);
    }

    #[tokio::test]
    async fn test_search_resets_to_first_page() {
        let api = Arc::new(InMemoryApi::new());
        api.seed_named(Resource::Classes, "Class", 25);
        let mut view = controller(api, Resource::Classes);
        view.refresh().await;

        view.go_to_page(3);
        view.set_search("Class");
        assert_eq!(view.page(), 1);
        assert_eq!(view.selected_index(), Some(0));
    }

    #[tokio::test]
    async fn test_create_shows_new_record_exactly_once() {
        let api = Arc::new(InMemoryApi::new());
        api.seed_named(Resource::Classes, "Class", 3);
        let mut view = controller(api.clone(), Resource::Classes);
        view.refresh().await;

        view.open_create();
        view.dialog_form_mut().unwrap().set("name", "Grade 9 East");
        assert!(view.submit().await);

        assert_eq!(view.dialog(), &DialogState::Closed);
        assert_eq!(api.list_calls(Resource::Classes), 2);
        let matches: Vec<_> = view
            .records()
            .iter()
            .filter(|r| r.text("name") == "Grade 9 East")
            .collect();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn test_edit_round_trip() {
        let api = Arc::new(InMemoryApi::new());
        api.seed_named(Resource::Classes, "Class", 3);
        let mut view = controller(api, Resource::Classes);
        view.refresh().await;

        assert!(view.open_edit(2));
        match view.dialog() {
            DialogState::Open { mode, form } => {
                assert_eq!(*mode, DialogMode::Edit(2));
                assert_eq!(form.get("name"), Some("Class 2"));
            }
            other => panic!("unexpected dialog state {other:?}"),
        }
        view.dialog_form_mut().unwrap().set("name", "Class 2 (renamed)");
        assert!(view.submit().await);

        let names: Vec<String> = view.records().iter().map(|r| r.text("name")).collect();
        assert_eq!(names.iter().filter(|n| *n == "Class 2 (renamed)").count(), 1);
        assert!(!names.contains(&"Class 2".to_string()));
        assert_eq!(view.records().len(), 3);

        assert!(!view.open_edit(99));
        assert!(view.banner().unwrap().contains("#99"));
    }

    #[tokio::test]
    async fn test_edit_leaves_unshown_fields_alone() {
        let api = Arc::new(InMemoryApi::new());
        api.seed(
            Resource::Students,
            vec![json!({
                "id": 1,
                "first_name": "Ann",
                "last_name": "Lee",
                "admission_number": "A-1",
                "class_name": "Form 2"
            })],
        );
        let mut view = controller(api.clone(), Resource::Students);
        view.refresh().await;

        assert!(view.open_edit(1));
        view.dialog_form_mut().unwrap().set("first_name", "Anne");
        assert!(view.submit().await);

        let stored = &api.records(Resource::Students)[0];
        assert_eq!(stored.text("first_name"), "Anne");
        assert_eq!(stored.text("class_name"), "Form 2");
        for field in ["class_id", "email", "date_of_birth"] {
            assert!(stored.get(field).is_none(), "{field} should not be sent");
        }
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let api = Arc::new(InMemoryApi::new());
        api.seed_named(Resource::Classes, "Class", 5);
        let mut view = controller(api.clone(), Resource::Classes);
        view.refresh().await;

        view.request_delete(4);
        view.cancel_delete();
        assert!(!view.confirm_delete().await);
        assert_eq!(api.records(Resource::Classes).len(), 5);

        view.request_delete(4);
        assert!(view.confirm_delete().await);
        assert!(view.records().iter().all(|r| r.id != 4));
        assert_eq!(view.records().len(), 4);
    }

    #[tokio::test]
    async fn test_forbidden_surfaces_permission_message() {
        let api = Arc::new(InMemoryApi::new());
        api.fail(Resource::Classes, Failure::Forbidden);
        let mut view = controller(api, Resource::Classes);
        view.refresh().await;

        assert!(matches!(view.load_state(), LoadState::Failed(_)));
        assert!(view.banner().unwrap().contains("You do not have permission"));
        assert!(view.page_rows().is_empty());
        assert!(!view.needs_login());
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_last_good_list() {
        let api = Arc::new(InMemoryApi::new());
        api.seed_named(Resource::Classes, "Class", 4);
        let mut view = controller(api.clone(), Resource::Classes);
        view.refresh().await;

        api.fail(Resource::Classes, Failure::Server);
        view.refresh().await;
        assert_eq!(view.records().len(), 4);
        assert!(view.banner().unwrap().starts_with("Failed to load classes"));

        api.heal(Resource::Classes);
        view.dismiss_banner();
        view.refresh().await;
        assert_eq!(view.load_state(), &LoadState::Loaded);
        assert_eq!(view.banner(), None);
    }

    #[tokio::test]
    async fn test_rejected_submit_keeps_dialog_and_form() {
        let api = Arc::new(InMemoryApi::new());
        let mut view = controller(api.clone(), Resource::Students);
        view.refresh().await;

        view.open_create();
        {
            let form = view.dialog_form_mut().unwrap();
            form.set("first_name", "Amina");
            form.set("last_name", "Otieno");
        }
        assert!(!view.submit().await);
        assert_eq!(
            view.banner(),
            Some("Please fill in the required fields: admission_number")
        );

        view.dialog_form_mut().unwrap().set("admission_number", "ADM-001");
        api.fail(
            Resource::Students,
            Failure::Validation(json!({"admission_number": ["student with this admission number already exists."]})),
        );
        assert!(!view.submit().await);
        assert_eq!(
            view.banner(),
            Some("admission_number: student with this admission number already exists.")
        );
        match view.dialog() {
            DialogState::Open { form, .. } => assert_eq!(form.get("first_name"), Some("Amina")),
            other => panic!("dialog should stay open, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_requests_login() {
        let api = Arc::new(InMemoryApi::new());
        api.fail(Resource::Fees, Failure::Unauthorized);
        let mut view = controller(api, Resource::Fees);
        view.refresh().await;
        assert!(view.needs_login());
    }

    #[tokio::test]
    async fn test_other_views_refetch_on_invalidation() {
        let api = Arc::new(InMemoryApi::new());
        let bus = CommandBus::new(api.clone());
        let mut classes = ListViewController::new(bus.clone(), Resource::Classes, 10);
        let mut students = ListViewController::new(bus.clone(), Resource::Students, 10);
        classes.refresh().await;
        students.refresh().await;

        bus.execute(Command::Create {
            resource: Resource::Classes,
            form: FormData::new().with("name", "Grade 10"),
        })
        .await
        .unwrap();

        assert!(classes.sync().await);
        assert!(!students.sync().await);
        assert_eq!(classes.records().len(), 1);
        assert_eq!(api.list_calls(Resource::Students), 1);
    }

    #[tokio::test]
    async fn test_selection_moves_within_page() {
        let api = Arc::new(InMemoryApi::new());
        api.seed(
            Resource::Classes,
            vec![json!({"id": 1, "name": "A"}), json!({"id": 2, "name": "B"})],
        );
        let mut view = controller(api, Resource::Classes);
        view.refresh().await;

        assert_eq!(view.selected_record().unwrap().id, 1);
        view.select_next();
        view.select_next();
        assert_eq!(view.selected_record().unwrap().id, 2);
        view.select_prev();
        assert_eq!(view.selected_record().unwrap().id, 1);

        view.select(Some(7));
        assert_eq!(view.selected_index(), Some(1));
        view.select(None);
        assert!(view.selected_record().is_none());
    }
}
