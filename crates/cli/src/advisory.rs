//! Commands for working with advisories.

use chrono::{DateTime, SecondsFormat, Utc};
use csaf_cms_models::{
    AdvisoryService,
    Revision,
    RevisionNote,
    TrackingStatus,
    TransitionOptions,
    WorkflowState,
    audit::AuditTrail,
};
use failure::Error;
use std::{fs, path::PathBuf};
use structopt::StructOpt;
use uuid::Uuid;

use crate::{Config, Identity, Result};
use super::util::{parse_state, parse_status, print_table, read_json};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(flatten)]
    identity: Identity,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List advisories
    #[structopt(name = "list")]
    List,
    /// Show an advisory
    #[structopt(name = "show")]
    Show(Target),
    /// Create a new advisory from a CSAF document
    #[structopt(name = "new")]
    New(NewOpts),
    /// Import an existing CSAF document with its version and history
    #[structopt(name = "import")]
    Import(ImportOpts),
    /// Replace the CSAF document of a draft advisory
    #[structopt(name = "update")]
    Update(UpdateOpts),
    /// Move an advisory to another workflow state
    #[structopt(name = "transition")]
    Transition(TransitionOpts),
    /// Start a new working version of a published advisory
    #[structopt(name = "new-version")]
    NewVersion(Revised),
    /// Delete an advisory with everything belonging to it
    #[structopt(name = "delete")]
    Delete(Revised),
    /// Write the CSAF document of an advisory
    #[structopt(name = "export")]
    Export(ExportOpts),
    /// Show the audit trail of an advisory
    #[structopt(name = "audit")]
    Audit(Target),
    /// Rebuild an advisory from its audit trail
    #[structopt(name = "replay")]
    Replay(ReplayOpts),
    /// Comment on an advisory
    #[structopt(name = "comment")]
    Comment(CommentOpts),
    /// Answer a comment
    #[structopt(name = "answer")]
    Answer(AnswerOpts),
    /// Change the text of a comment or answer
    #[structopt(name = "edit-comment")]
    EditComment(EditCommentOpts),
    /// List comments on an advisory
    #[structopt(name = "comments")]
    Comments(Target),
}

#[derive(StructOpt)]
pub struct Target {
    /// Advisory ID
    id: Uuid,
}

#[derive(StructOpt)]
pub struct Revised {
    /// Advisory ID
    id: Uuid,
    /// Revision the change is based on
    #[structopt(parse(from_str))]
    revision: Revision,
}

#[derive(StructOpt)]
pub struct Note {
    /// Summary of the revision history entry
    #[structopt(long = "summary", short = "s", default_value = "")]
    summary: String,
    /// Version this revision had in a previous system
    #[structopt(long = "legacy-version")]
    legacy_version: Option<String>,
}

impl Note {
    fn into_note(self) -> RevisionNote {
        RevisionNote {
            summary: self.summary,
            legacy_version: self.legacy_version,
        }
    }
}

pub fn main(cfg: &Config, opts: Opts) -> Result<(), Error> {
    let service = crate::service(cfg)?;
    let cmd = Cmd {
        service,
        caller: opts.identity.caller(),
    };

    match opts.command {
        Command::List => cmd.list(),
        Command::Show(opts) => cmd.show(opts),
        Command::New(opts) => cmd.new(opts),
        Command::Import(opts) => cmd.import(opts),
        Command::Update(opts) => cmd.update(opts),
        Command::Transition(opts) => cmd.transition(opts),
        Command::NewVersion(opts) => cmd.new_version(opts),
        Command::Delete(opts) => cmd.delete(opts),
        Command::Export(opts) => cmd.export(opts),
        Command::Audit(opts) => cmd.audit(opts),
        Command::Replay(opts) => cmd.replay(opts),
        Command::Comment(opts) => cmd.comment(opts),
        Command::Answer(opts) => cmd.answer(opts),
        Command::EditComment(opts) => cmd.edit_comment(opts),
        Command::Comments(opts) => cmd.comments(opts),
    }
}

struct Cmd {
    service: AdvisoryService,
    caller: csaf_cms_models::Caller,
}

#[derive(StructOpt)]
pub struct NewOpts {
    /// CSAF document, or - for standard input
    #[structopt(parse(from_os_str))]
    file: PathBuf,
    #[structopt(flatten)]
    note: Note,
}

#[derive(StructOpt)]
pub struct ImportOpts {
    /// CSAF document, or - for standard input
    #[structopt(parse(from_os_str))]
    file: PathBuf,
}

#[derive(StructOpt)]
pub struct UpdateOpts {
    #[structopt(flatten)]
    target: Revised,
    /// New CSAF document, or - for standard input
    #[structopt(parse(from_os_str))]
    file: PathBuf,
    #[structopt(flatten)]
    note: Note,
}

#[derive(StructOpt)]
pub struct TransitionOpts {
    #[structopt(flatten)]
    target: Revised,
    /// State to move to
    #[structopt(parse(try_from_str = parse_state))]
    state: WorkflowState,
    /// Release date of a publication; a future date schedules it
    #[structopt(long = "release-date")]
    release_date: Option<DateTime<Utc>>,
    /// Tracking status of a publication (final or interim)
    #[structopt(long = "status", parse(try_from_str = parse_status))]
    status: Option<TrackingStatus>,
}

#[derive(StructOpt)]
pub struct ExportOpts {
    /// Advisory ID
    id: Uuid,
    /// Write to this file instead of standard output
    #[structopt(long = "output", short = "o", parse(from_os_str))]
    output: Option<PathBuf>,
}

#[derive(StructOpt)]
pub struct ReplayOpts {
    /// Advisory ID
    id: Uuid,
    /// Only replay this many content changes
    #[structopt(long = "changes", short = "n")]
    changes: Option<usize>,
}

#[derive(StructOpt)]
pub struct CommentOpts {
    /// Advisory ID
    id: Uuid,
    /// Text of the comment
    text: String,
    /// JSON Pointer of the node this comment refers to
    #[structopt(long = "path")]
    path: Option<String>,
}

#[derive(StructOpt)]
pub struct AnswerOpts {
    /// ID of the comment to answer
    comment: Uuid,
    /// Text of the answer
    text: String,
}

#[derive(StructOpt)]
pub struct EditCommentOpts {
    /// Comment or answer ID
    comment: Uuid,
    /// Revision the change is based on
    #[structopt(parse(from_str))]
    revision: Revision,
    /// New text
    text: String,
}

impl Cmd {
    fn list(&self) -> Result<()> {
        let advisories = self.service.list_advisories(&self.caller)?;

        let rows = advisories.iter()
            .map(|advisory| (
                advisory.id.to_string(),
                advisory.tracking_id.as_ref().map_or("", String::as_str),
                advisory.version.as_ref().map_or("", String::as_str),
                advisory.workflow_state.as_str(),
                advisory.title.as_ref().map_or("", String::as_str),
            ))
            .collect::<Vec<_>>();

        print_table(("ID", "Tracking ID", "Version", "State", "Title"), &rows);

        Ok(())
    }

    fn show(&self, opts: Target) -> Result<()> {
        let details = self.service.get_advisory(&self.caller, opts.id)?;
        let info = &details.info;

        println!("ID:          {}", info.id);
        println!("Revision:    {}", info.revision);
        println!("Type:        {}", info.kind);
        println!("Title:       {}", info.title.as_ref().map_or("", String::as_str));
        println!("Tracking ID: {}", info.tracking_id.as_ref().map_or("", String::as_str));
        println!("Version:     {} ({})",
            info.version.as_ref().map_or("", String::as_str), info.versioning_type);
        println!("State:       {}", info.workflow_state);
        println!("Owner:       {}", info.owner);

        if let Some(date) = info.current_release_date {
            println!("Release:     {}", date.to_rfc3339_opts(SecondsFormat::Secs, true));
        }

        if !info.allowed_transitions.is_empty() {
            let states = info.allowed_transitions.iter()
                .map(|state| state.as_str())
                .collect::<Vec<_>>();
            println!("Next states: {}", states.join(", "));
        }

        Ok(())
    }

    fn new(&self, opts: NewOpts) -> Result<()> {
        let csaf = read_json(&opts.file)?;
        let saved = self.service.add_advisory(&self.caller, csaf, &opts.note.into_note())?;
        println!("Created advisory {} at revision {}", saved.id, saved.revision);
        Ok(())
    }

    fn import(&self, opts: ImportOpts) -> Result<()> {
        let csaf = read_json(&opts.file)?;
        let saved = self.service.import_advisory(&self.caller, csaf)?;
        println!("Imported advisory {} at revision {}", saved.id, saved.revision);
        Ok(())
    }

    fn update(&self, opts: UpdateOpts) -> Result<()> {
        let csaf = read_json(&opts.file)?;
        let Revised { id, revision } = opts.target;
        let revision = self.service.update_advisory(
            &self.caller, id, &revision, csaf, &opts.note.into_note())?;
        println!("Updated advisory {}, now at revision {}", id, revision);
        Ok(())
    }

    fn transition(&self, opts: TransitionOpts) -> Result<()> {
        let Revised { id, ref revision } = opts.target;
        let revision = self.service.change_workflow_state(
            &self.caller,
            id,
            &revision,
            opts.state,
            TransitionOptions {
                proposed_release_date: opts.release_date,
                tracking_status: opts.status,
            },
        )?;

        let state = self.service.get_advisory(&self.caller, id)
            .map(|details| details.info.workflow_state.to_string())
            .unwrap_or_else(|_| opts.state.to_string());

        println!("Advisory {} is now {}, at revision {}", id, state, revision);
        Ok(())
    }

    fn new_version(&self, opts: Revised) -> Result<()> {
        let revision = self.service.create_new_version(&self.caller, opts.id, &opts.revision)?;
        println!("Started new version of advisory {}, now at revision {}", opts.id, revision);
        Ok(())
    }

    fn delete(&self, opts: Revised) -> Result<()> {
        self.service.delete_advisory(&self.caller, opts.id, &opts.revision)?;
        println!("Deleted advisory {}", opts.id);
        Ok(())
    }

    fn export(&self, opts: ExportOpts) -> Result<()> {
        let csaf = self.service.export_advisory(&self.caller, opts.id)?;
        let text = serde_json::to_string_pretty(&csaf)?;

        match opts.output {
            Some(path) => fs::write(path, text + "\n")?,
            None => println!("{}", text),
        }

        Ok(())
    }

    fn audit(&self, opts: Target) -> Result<()> {
        let trail = self.service.audit_trail(&self.caller, opts.id)?;

        let rows = trail.iter()
            .map(|record| (
                record.created_at().to_rfc3339_opts(SecondsFormat::Secs, true),
                record.user().to_string(),
                record.kind().to_string(),
                describe(record),
            ))
            .collect::<Vec<_>>();

        print_table(("Date", "User", "Type", "Change"), &rows);

        Ok(())
    }

    fn replay(&self, opts: ReplayOpts) -> Result<()> {
        let advisory = self.service.reconstruct(&self.caller, opts.id, opts.changes)?;
        println!("{}", serde_json::to_string_pretty(&advisory)?);
        Ok(())
    }

    fn comment(&self, opts: CommentOpts) -> Result<()> {
        let saved = self.service.add_comment(&self.caller, opts.id, &opts.text, opts.path)?;
        println!("Created comment {}", saved.id);
        Ok(())
    }

    fn answer(&self, opts: AnswerOpts) -> Result<()> {
        let saved = self.service.add_answer(&self.caller, opts.comment, &opts.text)?;
        println!("Created answer {} to comment {}", saved.id, opts.comment);
        Ok(())
    }

    fn edit_comment(&self, opts: EditCommentOpts) -> Result<()> {
        let revision = self.service.update_comment(
            &self.caller, opts.comment, &opts.revision, &opts.text)?;
        println!("Updated comment {}, now at revision {}", opts.comment, revision);
        Ok(())
    }

    fn comments(&self, opts: Target) -> Result<()> {
        let comments = self.service.list_comments(&self.caller, opts.id)?;

        let rows = comments.iter()
            .map(|info| (
                info.id.to_string(),
                info.comment.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                info.comment.owner.as_str(),
                match info.comment.answer_to {
                    Some(comment) => format!("answer to {}", comment),
                    None => info.comment.field_path.clone().unwrap_or_default(),
                },
                info.comment.text.as_str(),
            ))
            .collect::<Vec<_>>();

        print_table(("ID", "Date", "Author", "Refers to", "Text"), &rows);

        Ok(())
    }
}

/// One-line description of an audit record.
fn describe(record: &AuditTrail) -> String {
    let version = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    match record {
        AuditTrail::AuditTrailDocument(change) => format!("{:?} {} -> {} ({} operations)",
            change.change_type,
            version(&change.old_doc_version),
            version(&change.doc_version),
            change.diff.0.len()),
        AuditTrail::AuditTrailWorkflow(change) => format!("{} -> {}",
            change.old_state, change.new_state),
        AuditTrail::AuditTrailComment(change) => format!("{:?} comment {}",
            change.change_type, change.comment_id),
    }
}
