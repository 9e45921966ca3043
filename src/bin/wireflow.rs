use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wireflow::components::slack::SlackSocketSource;
use wireflow::{
    builtin_registry, schedule, DependencyGraph, Executor, InstanceStatus, ListenerState,
    ListenerSupervisor, WorkflowContext, WorkflowDefinition, WorkflowStore,
};

#[derive(Parser)]
#[command(name = "wireflow")]
#[command(about = "Run declarative automation workflows", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding persisted workflow definitions
    #[arg(short, long, global = true, default_value = "workflows")]
    store: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List persisted workflows
    List,

    /// Import a workflow definition file into the store
    Import {
        /// Path to a workflow JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Validate a workflow and print its execution order
    Validate {
        /// Workflow name in the store
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Run a workflow once, end to end
    Run {
        /// Workflow name in the store
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Run a workflow's trigger as a persistent listener
    Listen {
        /// Workflow name in the store
        #[arg(value_name = "NAME")]
        name: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "wireflow=debug"
    } else {
        "wireflow=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let store = WorkflowStore::open(&cli.store)?;

    match cli.command {
        Commands::List => list_workflows(&store),
        Commands::Import { file } => import_workflow(&store, &file),
        Commands::Validate { name } => validate_workflow(&store, &name),
        Commands::Run { name } => run_workflow(&store, &name).await,
        Commands::Listen { name } => listen_workflow(&store, &name).await,
    }
}

fn list_workflows(store: &WorkflowStore) -> anyhow::Result<bool> {
    let names = store.list_workflows()?;
    if names.is_empty() {
        println!("no workflows in store");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(true)
}

fn import_workflow(store: &WorkflowStore, file: &PathBuf) -> anyhow::Result<bool> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let def: WorkflowDefinition =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;

    def.validate()?;
    store.save_workflow(&def)?;
    println!("imported '{}'", def.name);
    Ok(true)
}

fn load_and_schedule(
    store: &WorkflowStore,
    name: &str,
) -> anyhow::Result<(WorkflowDefinition, Vec<String>, Arc<wireflow::ComponentRegistry>)> {
    let def = store.load_workflow(name)?;
    let registry = Arc::new(builtin_registry());
    let graph = DependencyGraph::build(&def, &registry)?;
    let order = schedule(&graph);
    Ok((def, order, registry))
}

fn validate_workflow(store: &WorkflowStore, name: &str) -> anyhow::Result<bool> {
    let (def, order, _) = load_and_schedule(store, name)?;
    println!("workflow '{}' is valid", def.name);
    println!("execution order: {}", order.join(" -> "));
    Ok(true)
}

async fn run_workflow(store: &WorkflowStore, name: &str) -> anyhow::Result<bool> {
    let (def, order, registry) = load_and_schedule(store, name)?;

    let executor = Executor::new(registry);
    let context = WorkflowContext::new();
    let result = executor.run(&def, &order, &context).await;

    for id in &order {
        let status = match result.status(id) {
            InstanceStatus::Succeeded => "ok",
            InstanceStatus::Failed => "failed",
            InstanceStatus::NotRun => "not run",
        };
        println!("{:>8}  {}", status, id);
    }
    if let Some(failure) = &result.failure {
        println!("run {} failed at '{}': {}", result.run_id, failure.instance_id, failure.error);
    } else {
        println!("run {} completed", result.run_id);
    }

    Ok(result.success)
}

async fn listen_workflow(store: &WorkflowStore, name: &str) -> anyhow::Result<bool> {
    let (def, order, registry) = load_and_schedule(store, name)?;

    let trigger = def
        .trigger()
        .context("workflow has no trigger")?;
    let token = trigger
        .config
        .get("token")
        .context("listener trigger requires a literal 'token' parameter")?
        .clone();

    let source = SlackSocketSource::new(token);
    let supervisor = ListenerSupervisor::new(Arc::new(Executor::new(registry)));
    let mut handle = supervisor.start(def, &order, Box::new(source))?;

    println!("listening; press ctrl-c to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, stopping listener");
                handle.stop();
            }
            state = handle.changed() => match state {
                Some(state) => tracing::info!(?state, "listener state changed"),
                None => break,
            },
        }
    }

    Ok(handle.join().await != ListenerState::Errored)
}
