//! Versioning and workflow engine for CSAF security advisories.

#[macro_use] extern crate diesel;
#[macro_use] extern crate diesel_migrations;

mod config;

pub mod advisory;
pub mod audit;
pub mod classify;
pub mod comment;
pub mod db;
pub mod history;
pub mod permissions;
pub mod publish;
pub mod semver;
pub mod service;
pub mod storage;
pub mod validator;
pub mod versioning;
pub mod workflow;

pub use self::{
    advisory::{Advisory, TrackingStatus},
    config::{AutoPublish, Config, Summary, Versioning as VersioningConfig},
    permissions::{Caller, Roles},
    service::{AdvisoryService, RevisionNote, Saved, TransitionOptions},
    storage::{MemoryStorage, PgStorage, Revision, Storage},
    versioning::VersioningType,
    workflow::WorkflowState,
};
