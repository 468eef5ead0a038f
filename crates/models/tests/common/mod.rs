#![allow(dead_code)]

use csaf_cms_models::{
    AdvisoryService,
    Caller,
    Config,
    MemoryStorage,
    Revision,
    RevisionNote,
    Roles,
    Saved,
    TransitionOptions,
    VersioningType,
    WorkflowState,
    publish::PublishSink,
    storage::Storage,
    validator::{AcceptAll, Validator},
};
use failure::{Fallible, format_err};
use lazy_static::lazy_static;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

lazy_static! {
    /// A minimal CSAF document with one product and one vulnerability.
    pub static ref CSAF: Value = json!({
        "document": {
            "category": "csaf_base",
            "csaf_version": "2.0",
            "publisher": {
                "category": "vendor",
                "name": "Example Company",
                "namespace": "https://example.com",
            },
            "title": "Title1",
            "tracking": {
                "id": "EXAMPLE-2022-0001",
            },
        },
        "product_tree": {
            "full_product_names": [
                {"name": "Product A 1.0", "product_id": "CSAFPID-0001"},
            ],
        },
        "vulnerabilities": [
            {
                "cve": "CVE-2022-0001",
                "product_status": {"known_affected": ["CSAFPID-0001"]},
            },
        ],
    });
}

/// `CSAF` with a different title.
pub fn retitled(title: &str) -> Value {
    let mut csaf = CSAF.clone();
    csaf["document"]["title"] = title.into();
    csaf
}

/// `CSAF` with an additional vulnerability.
pub fn with_vulnerability(csaf: &Value, cve: &str) -> Value {
    let mut csaf = csaf.clone();
    if let Some(list) = csaf["vulnerabilities"].as_array_mut() {
        list.push(json!({"cve": cve}));
    }
    csaf
}

/// Author who also reviews and publishes their own advisories.
pub fn alice() -> Caller {
    Caller::new("alice", Roles::AUTHOR | Roles::REVIEWER | Roles::PUBLISHER)
}

pub fn author(name: &str) -> Caller {
    Caller::new(name, Roles::AUTHOR)
}

pub fn editor() -> Caller {
    Caller::new("eddie", Roles::EDITOR)
}

pub fn manager() -> Caller {
    Caller::new("mona", Roles::MANAGER)
}

pub fn auditor() -> Caller {
    Caller::new("audrey", Roles::AUDITOR)
}

/// Validator rejecting every document.
pub struct RejectAll;

impl Validator for RejectAll {
    fn is_valid(&self, _: &Value) -> Fallible<bool> {
        Ok(false)
    }
}

/// Publish sink remembering what it was given.
#[derive(Default)]
pub struct RecordingSink {
    pub published: Mutex<Vec<(String, Value)>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> RecordingSink {
        RecordingSink { fail: true, ..RecordingSink::default() }
    }

    pub fn names(&self) -> Vec<String> {
        self.published.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }
}

impl PublishSink for RecordingSink {
    fn publish(&self, name: &str, csaf: &Value) -> Fallible<()> {
        if self.fail {
            return Err(format_err!("endpoint unavailable"));
        }
        self.published.lock().unwrap().push((name.to_string(), csaf.clone()));
        Ok(())
    }
}

/// Service over in-memory storage.
pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub service: AdvisoryService,
}

impl Harness {
    pub fn new() -> Harness {
        Harness::with(Config::default(), Arc::new(AcceptAll))
    }

    pub fn integer() -> Harness {
        let mut config = Config::default();
        config.versioning.default = VersioningType::Integer;
        Harness::with(config, Arc::new(AcceptAll))
    }

    pub fn with(config: Config, validator: Arc<dyn Validator>) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let service = AdvisoryService::new(storage.clone(), validator, Arc::new(config));
        Harness { storage, service }
    }

    /// Create an advisory as `caller`.
    pub fn create(&self, caller: &Caller, csaf: Value) -> Fallible<Saved> {
        Ok(self.service.add_advisory(caller, csaf, &RevisionNote::new("Initial version"))?)
    }

    /// Stored representation of a document.
    pub fn stored(&self, id: Uuid) -> Fallible<Value> {
        Ok(self.storage.read(id)?.data)
    }

    pub fn revision(&self, id: Uuid) -> Fallible<Revision> {
        Ok(self.storage.read(id)?.revision)
    }

    pub fn version(&self, id: Uuid) -> Fallible<String> {
        let stored = self.stored(id)?;
        stored["csaf"]["document"]["tracking"]["version"].as_str()
            .map(str::to_string)
            .ok_or_else(|| format_err!("advisory {} has no version", id))
    }

    pub fn history_numbers(&self, id: Uuid) -> Fallible<Vec<String>> {
        let stored = self.stored(id)?;
        Ok(stored["csaf"]["document"]["tracking"]["revision_history"]
            .as_array()
            .map(|entries| entries.iter()
                .filter_map(|e| e["number"].as_str().map(str::to_string))
                .collect())
            .unwrap_or_default())
    }

    pub fn state(&self, id: Uuid) -> Fallible<String> {
        Ok(self.stored(id)?["workflowState"].as_str().unwrap_or_default().to_string())
    }

    pub fn update(&self, caller: &Caller, id: Uuid, csaf: Value, summary: &str)
    -> Fallible<Revision> {
        let revision = self.revision(id)?;
        Ok(self.service.update_advisory(
            caller, id, &revision, csaf, &RevisionNote::new(summary))?)
    }

    pub fn transition(&self, caller: &Caller, id: Uuid, to: WorkflowState)
    -> Fallible<Revision> {
        self.transition_with(caller, id, to, TransitionOptions::default())
    }

    pub fn transition_with(
        &self,
        caller: &Caller,
        id: Uuid,
        to: WorkflowState,
        options: TransitionOptions,
    ) -> Fallible<Revision> {
        let revision = self.revision(id)?;
        Ok(self.service.change_workflow_state(caller, id, &revision, to, options)?)
    }

    /// Walk an advisory from Draft to Published.
    pub fn publish(&self, caller: &Caller, id: Uuid) -> Fallible<()> {
        for state in &[
            WorkflowState::Review,
            WorkflowState::Approved,
            WorkflowState::RfPublication,
            WorkflowState::Published,
        ] {
            self.transition(caller, id, *state)?;
        }
        Ok(())
    }

    pub fn new_version(&self, caller: &Caller, id: Uuid) -> Fallible<Revision> {
        let revision = self.revision(id)?;
        Ok(self.service.create_new_version(caller, id, &revision)?)
    }
}
