pub mod controller;
pub mod datetime;
pub mod http;
pub mod store;
pub mod transaction;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod commands;
#[cfg(feature = "cli")]
pub mod config;
#[cfg(feature = "cli")]
pub mod render;

pub use controller::{
  AddOutcome,
  MutationOutcome,
  Notice,
  NoticeKind,
  Summary,
  TaskListController,
  ViewState
};
pub use http::HttpTaskStore;
pub use store::{
  RemoteFailure,
  StoreError,
  TaskStore
};
pub use ticklist_shared::{
  NewTask,
  Task,
  TaskId,
  TaskPatch
};

#[cfg(feature = "cli")]
#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<std::ffi::OsString>
) -> anyhow::Result<
  std::process::ExitCode
> {
  use anyhow::Context;
  use clap::Parser;
  use tracing::{
    debug,
    info
  };

  let cli = cli::GlobalCli::parse_from(
    raw_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting ticklist CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
      .chain(cli.api_url.map(|url| {
        ("api.url".to_string(), url)
      }))
  )?;
  debug!(
    api_url = %cfg.api_url,
    files = ?cfg.loaded_files,
    "resolved configuration"
  );

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async \
         runtime"
      )?;

  let renderer =
    render::Renderer::new(&cfg);
  let controller =
    TaskListController::new(
      HttpTaskStore::new(
        cfg.api_url.clone()
      )
    );
  let command = cli
    .command
    .unwrap_or(cli::Command::List);

  let succeeded = runtime.block_on(
    commands::dispatch(
      &controller,
      &renderer,
      command
    )
  )?;

  info!(succeeded, "done");
  Ok(if succeeded {
    std::process::ExitCode::SUCCESS
  } else {
    std::process::ExitCode::FAILURE
  })
}
