use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use docredirects_core::config::{RedirectsConfig, load_config};
use docredirects_core::records::load_records;
use docredirects_core::registry::load_registry;
use docredirects_core::runtime::{
    PathOverrides, ResolutionContext, ResolvedInputs, ResolvedPaths, init_layout,
    normalize_for_display, resolve_inputs, resolve_paths,
};
use docredirects_core::script::{ScriptTemplate, load_script_template};
use docredirects_core::{Error, Redirects, ValidationReport};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "docredirects",
    version,
    about = "Validate documentation redirect records and emit redirect tables"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "Redirect records file (JSON or YAML)")]
    records: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "Current locations file (JSON)")]
    registry: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[arg(short, long, global = true, help = "Log progress to stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    overrides: PathOverrides,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            overrides: PathOverrides {
                project_root: cli.project_root.clone(),
                config: cli.config.clone(),
                records: cli.records.clone(),
                registry: cli.registry.clone(),
            },
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Check redirect records against the current locations")]
    Validate(ValidateArgs),
    #[command(about = "Print the anchor redirects of one page as JSON")]
    Client(PageArgs),
    #[command(about = "Print the server-side redirect table as JSON")]
    Server,
    #[command(about = "Render the anchor redirect script of one page")]
    Script(ScriptArgs),
    #[command(name = "manual-script", about = "Render the manual-wide anchor redirect script")]
    ManualScript(OutputArgs),
    #[command(about = "Write .docredirects/config.toml")]
    Init(InitArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

#[derive(Debug, Args)]
struct PageArgs {
    page: String,
}

#[derive(Debug, Args)]
struct ScriptArgs {
    page: String,
    #[arg(short, long, value_name = "FILE", help = "Write to FILE instead of stdout")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct OutputArgs {
    #[arg(short, long, value_name = "FILE", help = "Write to FILE instead of stdout")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, help = "Overwrite an existing config file")]
    force: bool,
}

struct Session {
    paths: ResolvedPaths,
    inputs: ResolvedInputs,
    config: RedirectsConfig,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Validate(args)) => run_validate(&runtime, args),
        Some(Commands::Client(PageArgs { page })) => run_client(&runtime, &page),
        Some(Commands::Server) => run_server(&runtime),
        Some(Commands::Script(args)) => run_script(&runtime, args),
        Some(Commands::ManualScript(args)) => run_manual_script(&runtime, args),
        Some(Commands::Init(args)) => run_init(&runtime, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_validate(runtime: &RuntimeOptions, args: ValidateArgs) -> Result<ExitCode> {
    let session = open_session(runtime)?;
    let mut redirects = load_redirects(&session)?;
    let registry = load_registry(&session.inputs.registry_path)?;
    let identifiers = registry.len();

    let report = match redirects.validate(registry) {
        Ok(()) => None,
        Err(Error::InvalidRedirects(report)) => Some(*report),
        Err(error) => return Err(error.into()),
    };

    match args.format {
        ReportFormat::Json => {
            let rendered = match &report {
                Some(report) => serde_json::to_string_pretty(report)?,
                None => serde_json::to_string_pretty(&ValidationReport {
                    server_redirects: redirects.server_redirects()?.clone(),
                    client_redirects: redirects.client_redirects()?,
                    ..ValidationReport::default()
                })?,
            };
            println!("{rendered}");
        }
        ReportFormat::Text => match &report {
            Some(report) => {
                println!("redirects invalid");
                println!("violations: {}", report.violation_count());
                println!("{report}");
            }
            None => {
                println!("redirects valid");
                println!("identifiers: {identifiers}");
                println!("records: {}", redirects.records().len());
                println!(
                    "server_redirects: {}",
                    redirects.server_redirects()?.len()
                );
                println!(
                    "client_redirects: {}",
                    redirects.client_redirects()?.len()
                );
            }
        },
    }
    print_diagnostics(runtime, &session);

    Ok(if report.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run_client(runtime: &RuntimeOptions, page: &str) -> Result<ExitCode> {
    let session = open_session(runtime)?;
    let redirects = validated_redirects(&session)?;
    let table = redirects.client_redirects_for(page.trim())?;
    println!("{}", serde_json::to_string_pretty(&table)?);
    print_diagnostics(runtime, &session);
    Ok(ExitCode::SUCCESS)
}

fn run_server(runtime: &RuntimeOptions) -> Result<ExitCode> {
    let session = open_session(runtime)?;
    let redirects = validated_redirects(&session)?;
    println!(
        "{}",
        serde_json::to_string_pretty(redirects.server_redirects()?)?
    );
    print_diagnostics(runtime, &session);
    Ok(ExitCode::SUCCESS)
}

fn run_script(runtime: &RuntimeOptions, args: ScriptArgs) -> Result<ExitCode> {
    let session = open_session(runtime)?;
    let redirects = validated_redirects(&session)?;
    let script = redirects.redirects_script(args.page.trim())?;
    emit(&script, args.output.as_deref())?;
    print_diagnostics(runtime, &session);
    Ok(ExitCode::SUCCESS)
}

fn run_manual_script(runtime: &RuntimeOptions, args: OutputArgs) -> Result<ExitCode> {
    let session = open_session(runtime)?;
    let redirects = validated_redirects(&session)?;
    let script = redirects.manual_script(&ScriptTemplate::manual_default())?;
    emit(&script, args.output.as_deref())?;
    print_diagnostics(runtime, &session);
    Ok(ExitCode::SUCCESS)
}

fn run_init(runtime: &RuntimeOptions, args: InitArgs) -> Result<ExitCode> {
    let paths = resolve_runtime_paths(runtime)?;
    let report = init_layout(&paths, args.force)?;

    println!("Initialized docredirects layout");
    println!("project_root: {}", normalize_for_display(&paths.project_root));
    println!("config_path: {}", normalize_for_display(&paths.config_path));
    println!("created_dirs: {}", report.created_dirs.len());
    println!("wrote_config: {}", report.wrote_config);
    if !report.wrote_config {
        println!("config already exists (use --force to overwrite)");
    }
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(ExitCode::SUCCESS)
}

fn open_session(runtime: &RuntimeOptions) -> Result<Session> {
    let paths = resolve_runtime_paths(runtime)?;
    let config = load_config(&paths.config_path)?;
    let inputs = resolve_inputs(&paths, &config, &runtime.overrides);
    tracing::debug!(
        records = %normalize_for_display(&inputs.records_path),
        registry = %normalize_for_display(&inputs.registry_path),
        "resolved inputs"
    );
    Ok(Session {
        paths,
        inputs,
        config,
    })
}

fn load_redirects(session: &Session) -> Result<Redirects> {
    let records = load_records(&session.inputs.records_path)?;
    let template = match &session.inputs.script_template {
        Some(path) => load_script_template(path, session.config.placeholder())?,
        None => ScriptTemplate::anchor_default(),
    };
    Ok(Redirects::new(records, template))
}

fn validated_redirects(session: &Session) -> Result<Redirects> {
    let mut redirects = load_redirects(session)?;
    let registry = load_registry(&session.inputs.registry_path)?;
    redirects.validate(registry).with_context(|| {
        format!(
            "redirects in {} are invalid",
            normalize_for_display(&session.inputs.records_path)
        )
    })?;
    Ok(redirects)
}

fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %normalize_for_display(path), "wrote redirect script");
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn print_diagnostics(runtime: &RuntimeOptions, session: &Session) {
    if runtime.diagnostics {
        println!(
            "\n[diagnostics]\n{}\n{}",
            session.paths.diagnostics(),
            session.inputs.diagnostics()
        );
    }
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<ResolvedPaths> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let initial = resolve_paths(&context, &runtime.overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    resolve_paths(&context, &runtime.overrides)
}
