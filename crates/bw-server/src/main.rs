//! `bw-server` binary: run the remote build service or build one task locally

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bw_build::{Artifact, BuildContext};
use bw_catalog::TargetVersion;
use bw_server::{RemoteBuildService, ServiceConfig, TcpAcceptor};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("bw-server")
        .version(bw_server::VERSION)
        .about("Buildwright remote build service")
        .subcommand_required(true)
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level"),
        )
        .subcommand(
            Command::new("serve")
                .about("Accept build requests over TCP")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML service configuration"),
                )
                .arg(
                    Arg::new("bind")
                        .long("bind")
                        .value_parser(value_parser!(SocketAddr))
                        .help("Listen address (default 127.0.0.1:2012)"),
                )
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Data directory root"),
                ),
        )
        .subcommand(
            Command::new("compile")
                .about("Build one task in-process")
                .arg(
                    Arg::new("task")
                        .long("task")
                        .required(true)
                        .help("Exact task name"),
                )
                .arg(
                    Arg::new("yaml")
                        .long("yaml")
                        .required(true)
                        .help("Base64-encoded YAML task payload"),
                )
                .arg(
                    Arg::new("version")
                        .long("version")
                        .help("Target version (default: every compatible version)"),
                )
                .arg(
                    Arg::new("confuse")
                        .long("confuse")
                        .action(ArgAction::SetTrue)
                        .help("Obfuscate the output"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Copy artifacts into this directory"),
                )
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Data directory root"),
                ),
        );

    let matches = cli.get_matches();
    init_tracing(matches.get_flag("debug"));

    match matches.subcommand() {
        Some(("serve", args)) => serve(args).await,
        Some(("compile", args)) => compile(args).await,
        _ => Ok(()),
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn serve(args: &ArgMatches) -> anyhow::Result<()> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => ServiceConfig::from_toml_file(path)?,
        None => ServiceConfig::new(),
    };
    if let Some(bind) = args.get_one::<SocketAddr>("bind") {
        config = config.with_bind(*bind);
    }
    if let Some(root) = args.get_one::<PathBuf>("data-dir") {
        config.build = config.build.with_data_dir(root);
    }

    let acceptor = TcpAcceptor::bind(config.bind).await?;
    info!(addr = %acceptor.local_addr()?, "Listening");

    let mut service = RemoteBuildService::new(config);
    service
        .serve_with_shutdown(acceptor, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;
    service.context_mut().dispose();
    Ok(())
}

async fn compile(args: &ArgMatches) -> anyhow::Result<()> {
    let task_name = args.get_one::<String>("task").context("--task is required")?;
    let encoded = args.get_one::<String>("yaml").context("--yaml is required")?;
    let yaml = String::from_utf8(STANDARD.decode(encoded.trim()).context("--yaml is not valid base64")?)
        .context("--yaml is not UTF-8")?;
    let version = args
        .get_one::<String>("version")
        .map(|v| v.parse::<TargetVersion>())
        .transpose()?;

    let mut build = ServiceConfig::new().build;
    if let Some(root) = args.get_one::<PathBuf>("data-dir") {
        build = build.with_data_dir(root);
    }
    let mut context = BuildContext::new(build);
    context.catalog_mut().ingest_yaml(&yaml)?;
    let id = context
        .catalog()
        .task_by_name(task_name)
        .map(|task| task.id)
        .with_context(|| format!("task not found: {task_name}"))?;
    context.catalog_mut().set_obfuscate(id, args.get_flag("confuse"))?;

    let artifacts = match version {
        Some(version) => vec![context.build_version(id, version).await?],
        None => {
            let report = context.build(id).await?;
            for (version, e) in report.failed() {
                warn!(%version, error = %e, "Version failed");
            }
            if report.succeeded().is_empty() {
                bail!("every version of {task_name} failed to build");
            }
            report.results.into_values().filter_map(Result::ok).collect()
        }
    };

    let output = args.get_one::<PathBuf>("output");
    for artifact in &artifacts {
        let location = match output {
            Some(dir) => Some(copy_artifact(dir, artifact)?),
            None => artifact.path.clone(),
        };
        info!(
            version = %artifact.version,
            size = artifact.len(),
            sha256 = %artifact.sha256,
            path = ?location,
            "Built"
        );
    }
    Ok(())
}

fn copy_artifact(dir: &Path, artifact: &Artifact) -> anyhow::Result<PathBuf> {
    let target_dir = dir.join(artifact.version.dir_name());
    std::fs::create_dir_all(&target_dir).with_context(|| format!("cannot create {}", target_dir.display()))?;
    let file_name = artifact
        .path
        .as_ref()
        .and_then(|p| p.file_name())
        .map_or_else(|| format!("{}.exe", artifact.task_name), |n| n.to_string_lossy().into_owned());
    let target = target_dir.join(file_name);
    std::fs::write(&target, &artifact.bytes).with_context(|| format!("cannot write {}", target.display()))?;
    Ok(target)
}
