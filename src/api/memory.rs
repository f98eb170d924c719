//! In-memory backend used by unit tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use super::errors::ApiError;
use super::SchoolApi;
use crate::models::{FormData, Record, Resource, User};

/// Failure injected for every call touching a resource
#[derive(Debug, Clone)]
pub enum Failure {
    Unauthorized,
    Forbidden,
    Validation(Value),
    Server,
}

impl Failure {
    fn to_error(&self) -> ApiError {
        match self {
            Failure::Unauthorized => ApiError::Unauthorized,
            Failure::Forbidden => ApiError::Forbidden {
                detail: Some("You do not have permission to perform this action.".to_string()),
            },
            Failure::Validation(body) => ApiError::Validation {
                status: 400,
                body: body.clone(),
            },
            Failure::Server => ApiError::Server {
                status: 500,
                body: "Internal Server Error".to_string(),
            },
        }
    }
}

#[derive(Default)]
struct State {
    collections: HashMap<Resource, Vec<Record>>,
    failures: HashMap<Resource, Failure>,
    list_calls: HashMap<Resource, usize>,
    user: Option<User>,
    next_id: i64,
}

#[derive(Default)]
pub struct InMemoryApi {
    state: Mutex<State>,
}

impl InMemoryApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.state.lock().unwrap().next_id = 1000;
        api
    }

    pub fn seed(&self, resource: Resource, records: Vec<Value>) {
        let records = records.into_iter().filter_map(Record::from_value).collect();
        self.state.lock().unwrap().collections.insert(resource, records);
    }

    /// `count` records named "<prefix> 1".."<prefix> count" with ids 1..=count
    pub fn seed_named(&self, resource: Resource, prefix: &str, count: i64) {
        let records = (1..=count)
            .map(|i| json!({"id": i, "name": format!("{} {}", prefix, i)}))
            .collect();
        self.seed(resource, records);
    }

    pub fn fail(&self, resource: Resource, failure: Failure) {
        self.state.lock().unwrap().failures.insert(resource, failure);
    }

    pub fn heal(&self, resource: Resource) {
        self.state.lock().unwrap().failures.remove(&resource);
    }

    pub fn set_user(&self, user: Option<User>) {
        self.state.lock().unwrap().user = user;
    }

    pub fn list_calls(&self, resource: Resource) -> usize {
        *self.state.lock().unwrap().list_calls.get(&resource).unwrap_or(&0)
    }

    pub fn records(&self, resource: Resource) -> Vec<Record> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(&resource)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self, resource: Resource) -> Result<(), ApiError> {
        match self.state.lock().unwrap().failures.get(&resource) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

fn merge(record: &mut Record, form: &FormData) {
    if let Value::Object(map) = form.to_json() {
        for (key, value) in map {
            record.fields.insert(key, value);
        }
    }
}

#[async_trait]
impl SchoolApi for InMemoryApi {
    async fn list(&self, resource: Resource) -> Result<Vec<Record>, ApiError> {
        *self.state.lock().unwrap().list_calls.entry(resource).or_insert(0) += 1;
        self.check(resource)?;
        Ok(self.records(resource))
    }

    async fn get(&self, resource: Resource, id: i64) -> Result<Record, ApiError> {
        self.check(resource)?;
        self.records(resource)
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("{} {}", resource, id)))
    }

    async fn create(&self, resource: Resource, form: &FormData) -> Result<Option<Record>, ApiError> {
        self.check(resource)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let mut record = Record {
            id: state.next_id,
            fields: Default::default(),
        };
        merge(&mut record, form);
        state
            .collections
            .entry(resource)
            .or_default()
            .push(record.clone());
        Ok(Some(record))
    }

    async fn update(
        &self,
        resource: Resource,
        id: i64,
        form: &FormData,
    ) -> Result<Option<Record>, ApiError> {
        self.check(resource)?;
        let mut state = self.state.lock().unwrap();
        let record = state
            .collections
            .entry(resource)
            .or_default()
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("{} {}", resource, id)))?;
        merge(record, form);
        Ok(Some(record.clone()))
    }

    async fn delete(&self, resource: Resource, id: i64) -> Result<(), ApiError> {
        self.check(resource)?;
        let mut state = self.state.lock().unwrap();
        let records = state.collections.entry(resource).or_default();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(ApiError::NotFound(format!("{} {}", resource, id)));
        }
        Ok(())
    }

    async fn upload_document(&self, title: &str, path: &Path) -> Result<Option<Record>, ApiError> {
        let form = FormData::new()
            .with("title", title)
            .with("file", &path.display().to_string());
        self.create(Resource::Documents, &form).await
    }

    async fn login(&self, username: &str, _password: &str) -> Result<User, ApiError> {
        self.state
            .lock()
            .unwrap()
            .user
            .clone()
            .filter(|u| u.username == username)
            .ok_or_else(|| ApiError::Validation {
                status: 401,
                body: json!({"detail": "No active account found with the given credentials"}),
            })
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.state
            .lock()
            .unwrap()
            .user
            .clone()
            .ok_or(ApiError::Unauthorized)
    }
}
