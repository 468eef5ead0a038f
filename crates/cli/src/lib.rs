use csaf_cms_models::{
    AdvisoryService,
    Caller,
    PgStorage,
    Roles,
    db,
    validator::MandatoryFields,
};
use failure::Error;
use sentry::protocol::Event;
use std::{env, mem, path::PathBuf, sync::Arc};
use structopt::StructOpt;

mod advisory;
mod config;
mod publish;
mod util;

use self::config::Config;

pub type Result<T, E=Error> = std::result::Result<T, E>;

#[derive(StructOpt)]
#[structopt(name = "csaf-cms")]
struct Opts {
    /// Configuration file
    #[structopt(long = "config", short = "c", default_value = "config.toml", parse(from_os_str))]
    config: PathBuf,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Manage advisories
    #[structopt(name = "advisory")]
    Advisory(advisory::Opts),
    /// Publish scheduled advisories
    #[structopt(name = "publish")]
    Publish(publish::Opts),
}

/// Identity under which a command is run.
#[derive(StructOpt)]
pub struct Identity {
    /// Name of the acting user
    #[structopt(long = "user", short = "u", env = "CSAF_CMS_USER")]
    user: String,
    /// Comma separated roles of the acting user
    #[structopt(
        long = "roles",
        env = "CSAF_CMS_ROLES",
        parse(try_from_str = Roles::parse_list),
    )]
    roles: Roles,
}

impl Identity {
    pub fn caller(&self) -> Caller {
        Caller::new(self.user.as_str(), self.roles)
    }
}

pub fn main() -> Result<(), Error> {
    let opts = Opts::from_args();
    let config = crate::config::load(&opts.config)?;

    setup_sentry(&config);
    setup_logging(&config.logging)?;

    match opts.command {
        Command::Advisory(opts) => advisory::main(&config, opts),
        Command::Publish(opts) => publish::main(&config, opts),
    }
}

/// Build an advisory service over the configured database.
fn service(config: &Config) -> Result<AdvisoryService> {
    let pool = db::configure_pool(config.model.database.as_ref())?;

    Ok(AdvisoryService::new(
        Arc::new(PgStorage::new(pool)),
        Arc::new(MandatoryFields),
        Arc::new(config.model.clone()),
    ))
}

fn setup_sentry(config: &Config) {
    if let Some(ref sentry) = config.sentry {
        env::set_var("RUST_BACKTRACE", "1");
        mem::forget(sentry::init((sentry.dsn.as_str(), sentry::ClientOptions {
            trim_backtraces: true,
            debug: cfg!(debug_assertions),
            release: Some(env!("CARGO_PKG_VERSION").into()),
            before_send: Some(Arc::new(Box::new(before_send_event_to_sentry))),
            .. Default::default()
        })));
        sentry::integrations::panic::register_panic_handler();
    }
}

fn setup_logging(config: &crate::config::Logging) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(config.level);

    for (module, level) in &config.filters {
        builder.filter_module(&module, *level);
    }

    builder.try_init()?;

    Ok(())
}

/// Advisories are confidential until published; never ship their content.
fn before_send_event_to_sentry(mut ev: Event<'static>) -> Option<Event<'static>> {
    ev.extra.remove("csaf");
    Some(ev)
}
