//! Delivery of published advisories and the scheduled publication job.

use actix::{Actor, AsyncContext, Context};
use chrono::{DateTime, Utc};
use csaf_cms_error::{Error, Status};
use failure::ResultExt;
use log::{error, info, warn};
use serde_json::Value;
use std::{fs, io::Write, path::PathBuf, sync::Arc, time::Duration};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::{
    advisory::TrackingStatus,
    permissions::{Caller, Roles},
    service::{AdvisoryService, Scheduled, TransitionOptions},
    storage::Revision,
    workflow::WorkflowState,
};

/// Downstream endpoint receiving published CSAF documents.
pub trait PublishSink: Send + Sync {
    /// Deliver a document. `name` is the file name stem it should be
    /// published under.
    fn publish(&self, name: &str, csaf: &Value) -> Result<(), failure::Error>;
}

/// Writes each published document as `<name>.json` into a directory.
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    pub fn new<P: Into<PathBuf>>(directory: P) -> DirectorySink {
        DirectorySink { directory: directory.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.json", name))
    }
}

impl PublishSink for DirectorySink {
    fn publish(&self, name: &str, csaf: &Value) -> Result<(), failure::Error> {
        fs::create_dir_all(&self.directory)
            .with_context(|_| format!("cannot create {}", self.directory.display()))?;

        // Write to a temporary file first, so that readers of the directory
        // never see a partially written document.
        let mut file = NamedTempFile::new_in(&self.directory)?;
        serde_json::to_writer_pretty(&mut file, csaf)?;
        file.write_all(b"\n")?;
        file.persist(self.path_for(name)).map_err(|err| err.error)?;

        Ok(())
    }
}

/// File name stem of a published document: its lowercased tracking ID with
/// every character other than `+`, `-` and ASCII alphanumerics replaced by
/// an underscore.
pub fn file_name(tracking_id: &str) -> String {
    tracking_id.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '+' | '-' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

/// Outcome of a single run of the publication job.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub published: Vec<Uuid>,
    /// Advisories changed concurrently, to be retried next run.
    pub skipped: Vec<Uuid>,
    pub failed: Vec<Uuid>,
}

/// Periodically publishes advisories whose scheduled release date has come.
pub struct AutoPublisher {
    service: AdvisoryService,
    sink: Arc<dyn PublishSink>,
    caller: Caller,
    interval: Duration,
}

impl AutoPublisher {
    pub fn new(service: AdvisoryService, sink: Arc<dyn PublishSink>) -> AutoPublisher {
        let interval = service.config().auto_publish.interval();

        AutoPublisher {
            service,
            sink,
            caller: Caller::service_account("publisher", Roles::PUBLISHER),
            interval,
        }
    }

    /// Publish every advisory due at `now`.
    ///
    /// A failure publishing one advisory never stops the others from being
    /// published.
    pub fn run(&self, now: DateTime<Utc>) -> Result<PublishReport, Error> {
        let mut report = PublishReport::default();

        for scheduled in self.service.due_for_publication(now)? {
            let id = scheduled.id;

            match self.publish(scheduled, now) {
                Ok(_) => report.published.push(id),
                Err(err) if err.status() == Status::Conflict => {
                    warn!("Advisory {} changed while being published, skipping: {}", id, err);
                    report.skipped.push(id);
                }
                Err(err) => {
                    error!("Could not publish advisory {}: {}", id, err);
                    report.failed.push(id);
                }
            }
        }

        Ok(report)
    }

    /// Publish one advisory.
    ///
    /// The sink receives the document as it will be stored once published,
    /// and the advisory only becomes published once the sink accepted it.
    fn publish(&self, scheduled: Scheduled, now: DateTime<Utc>) -> Result<Revision, Error> {
        let Scheduled { id, revision, advisory } = scheduled;

        let name = file_name(advisory.tracking_id().unwrap_or(&id.to_string()));

        let revision = self.service.change_workflow_state_at(
            &self.caller,
            id,
            &revision,
            WorkflowState::Published,
            TransitionOptions {
                proposed_release_date: None,
                tracking_status: Some(TrackingStatus::Final),
            },
            now,
            |published| Ok(self.sink.publish(&name, &published.csaf_value())?),
        )?;

        info!("Published scheduled advisory {} as {}", id, name);

        Ok(revision)
    }

    fn on_interval(&mut self, _: &mut Context<Self>) {
        match self.run(Utc::now()) {
            Ok(report) => if !report.published.is_empty() {
                info!("Auto-publish: {} published, {} skipped, {} failed",
                    report.published.len(), report.skipped.len(), report.failed.len());
            },
            Err(err) => error!("Error looking for advisories to publish: {}", err),
        }
    }
}

impl Actor for AutoPublisher {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(self.interval, Self::on_interval);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(file_name("BSI-2022-0001"), "bsi-2022-0001");
        assert_eq!(file_name("Example Co/ADV 1.2"), "example_co_adv_1_2");
    }

    #[test]
    fn directory_sink_writes_documents() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        let csaf = json!({"document": {"title": "T"}});

        sink.publish("acme-1", &csaf).unwrap();

        let written = fs::read(sink.path_for("acme-1")).unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&written).unwrap(), csaf);
    }
}
