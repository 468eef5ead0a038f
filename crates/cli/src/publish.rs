//! Scheduled publication.

use actix::{Actor, System};
use chrono::Utc;
use csaf_cms_models::publish::{AutoPublisher, DirectorySink};
use failure::{Error, format_err};
use log::info;
use std::sync::Arc;
use structopt::StructOpt;

use crate::{Config, Result};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Run the auto-publish job until interrupted
    #[structopt(name = "start")]
    Start,
    /// Publish every advisory due now and exit
    #[structopt(name = "once")]
    Once,
}

pub fn main(cfg: &Config, opts: Opts) -> Result<(), Error> {
    match opts.command {
        Command::Start => start(cfg),
        Command::Once => once(cfg),
    }
}

fn publisher(cfg: &Config) -> Result<AutoPublisher> {
    let service = crate::service(cfg)?;
    let sink = DirectorySink::new(cfg.model.auto_publish.directory.clone());
    Ok(AutoPublisher::new(service, Arc::new(sink)))
}

pub fn start(cfg: &Config) -> Result<(), Error> {
    if !cfg.model.auto_publish.enabled {
        return Err(format_err!("auto-publish is disabled in configuration"));
    }

    let system = System::new("csaf-cms");
    let publisher = publisher(cfg)?;

    info!("Publishing scheduled advisories into {} every {}s",
        cfg.model.auto_publish.directory.display(),
        cfg.model.auto_publish.interval().as_secs());

    publisher.start();
    system.run()?;

    Ok(())
}

pub fn once(cfg: &Config) -> Result<(), Error> {
    let report = publisher(cfg)?.run(Utc::now())?;

    for id in &report.published {
        println!("Published {}", id);
    }
    for id in &report.skipped {
        println!("Skipped {} (changed concurrently)", id);
    }
    for id in &report.failed {
        println!("Failed {}", id);
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(format_err!("{} advisories could not be published", report.failed.len()))
    }
}
