pub mod archive;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod datetime;
pub mod filter;
pub mod fixtures;
pub mod form;
pub mod planner;
pub mod quick_add;
pub mod render;
pub mod session;
pub mod settings;
pub mod store;

use std::ffi::OsString;
use std::io::{
  self,
  IsTerminal
};

use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting planner"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;
  if cli.no_fixtures {
    cfg.fixtures.load = false;
  }
  debug!(?cfg, "effective config");

  let renderer =
    render::Renderer::new(&cfg);
  let mut session =
    session::Session::from_config(
      &cfg,
      renderer,
      clock::SystemClock
    )?;

  let stdin = io::stdin();
  let interactive =
    stdin.is_terminal();
  let mut stdout = io::stdout().lock();
  session.run(
    stdin.lock(),
    &mut stdout,
    interactive
  )?;

  info!("done");
  Ok(())
}
