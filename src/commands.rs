//! Mutation commands and the invalidation bus
//!
//! Every create/update/delete/upload goes through [`CommandBus::execute`].
//! A successful command announces an [`Invalidation`] for the collection it
//! touched; list views subscribe and refetch instead of being poked manually.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{ApiError, SchoolApi};
use crate::models::{FormData, Record, Resource};

const INVALIDATION_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create { resource: Resource, form: FormData },
    Update { resource: Resource, id: i64, form: FormData },
    Delete { resource: Resource, id: i64 },
    Upload { title: String, path: PathBuf },
}

impl Command {
    /// Collection whose server state the command changes
    pub fn resource(&self) -> Resource {
        match self {
            Command::Create { resource, .. }
            | Command::Update { resource, .. }
            | Command::Delete { resource, .. } => *resource,
            Command::Upload { .. } => Resource::Documents,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Command::Create { resource, .. } => format!("create {}", resource),
            Command::Update { resource, id, .. } => format!("update {} #{}", resource, id),
            Command::Delete { resource, id } => format!("delete {} #{}", resource, id),
            Command::Upload { path, .. } => format!("upload {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Created(Option<Record>),
    Updated(Option<Record>),
    Deleted(i64),
    Uploaded(Option<Record>),
}

impl CommandOutcome {
    pub fn record(&self) -> Option<&Record> {
        match self {
            CommandOutcome::Created(record)
            | CommandOutcome::Updated(record)
            | CommandOutcome::Uploaded(record) => record.as_ref(),
            CommandOutcome::Deleted(_) => None,
        }
    }
}

/// Announcement that a collection changed on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invalidation {
    pub resource: Resource,
}

#[derive(Clone)]
pub struct CommandBus {
    api: Arc<dyn SchoolApi>,
    sender: broadcast::Sender<Invalidation>,
}

impl CommandBus {
    pub fn new(api: Arc<dyn SchoolApi>) -> Self {
        let (sender, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self { api, sender }
    }

    pub fn api(&self) -> Arc<dyn SchoolApi> {
        Arc::clone(&self.api)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.sender.subscribe()
    }

    /// Announce a change made outside the bus
    pub fn invalidate(&self, resource: Resource) {
        if self.sender.send(Invalidation { resource }).is_err() {
            debug!("No subscribers for {} invalidation", resource);
        }
    }

    pub async fn execute(&self, command: Command) -> Result<CommandOutcome, ApiError> {
        let resource = command.resource();
        let description = command.describe();

        if let Command::Create { form, .. } | Command::Update { form, .. } = &command {
            let missing = form.missing_required(resource);
            if !missing.is_empty() {
                return Err(ApiError::MissingFields(
                    missing.into_iter().map(str::to_string).collect(),
                ));
            }
        }

        let result = match command {
            Command::Create { resource, form } => {
                self.api.create(resource, &form).await.map(CommandOutcome::Created)
            }
            Command::Update { resource, id, form } => {
                self.api.update(resource, id, &form).await.map(CommandOutcome::Updated)
            }
            Command::Delete { resource, id } => {
                self.api.delete(resource, id).await.map(|_| CommandOutcome::Deleted(id))
            }
            Command::Upload { title, path } => self
                .api
                .upload_document(&title, &path)
                .await
                .map(CommandOutcome::Uploaded),
        };

        match &result {
            Ok(_) => {
                info!("Command succeeded: {}", description);
                self.invalidate(resource);
            }
            Err(e) => warn!("Command failed: {}: {}", description, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{Failure, InMemoryApi};

    fn bus_with(api: Arc<InMemoryApi>) -> CommandBus {
        CommandBus::new(api)
    }

    #[tokio::test]
    async fn test_success_publishes_invalidation() {
        let api = Arc::new(InMemoryApi::new());
        let bus = bus_with(api.clone());
        let mut rx = bus.subscribe();

        let outcome = bus
            .execute(Command::Create {
                resource: Resource::Classes,
                form: FormData::new().with("name", "Grade 8"),
            })
            .await
            .unwrap();

        assert_eq!(outcome.record().unwrap().text("name"), "Grade 8");
        assert_eq!(rx.try_recv().unwrap(), Invalidation { resource: Resource::Classes });
        assert_eq!(api.records(Resource::Classes).len(), 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_invalidate() {
        let api = Arc::new(InMemoryApi::new());
        api.fail(Resource::Classes, Failure::Forbidden);
        let bus = bus_with(api);
        let mut rx = bus.subscribe();

        let err = bus
            .execute(Command::Delete { resource: Resource::Classes, id: 3 })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Forbidden { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_required_fields_never_reach_the_api() {
        let api = Arc::new(InMemoryApi::new());
        let bus = bus_with(api.clone());

        let err = bus
            .execute(Command::Create {
                resource: Resource::Subjects,
                form: FormData::new().with("name", "Biology"),
            })
            .await
            .unwrap_err();

        match err {
            ApiError::MissingFields(fields) => assert_eq!(fields, vec!["code".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(api.records(Resource::Subjects).is_empty());
    }

    #[test]
    fn test_upload_targets_documents() {
        let command = Command::Upload {
            title: "Term report".to_string(),
            path: PathBuf::from("/tmp/report.pdf"),
        };
        assert_eq!(command.resource(), Resource::Documents);
        assert_eq!(command.describe(), "upload /tmp/report.pdf");
    }
}
