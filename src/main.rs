mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, HistoryCommand};
use spec_workflow::config::SpecflowConfig;
use spec_workflow::delta::SpecDelta;
use spec_workflow::domain::Workflow;
use spec_workflow::engine::{EngineSettings, GenerationEvent, SpecEngine};
use spec_workflow::llm::{CommandProvider, LlmProvider, ScriptedProvider};
use spec_workflow::phase::Phase;
use spec_workflow::storage::WorkflowStore;
use spec_workflow::{logging, WorkflowId};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = match &cli.config {
        Some(path) => SpecflowConfig::load(path)?,
        None => SpecflowConfig::discover(&project_dir)?,
    };

    let store = WorkflowStore::open(config.store_root(&project_dir))?;
    let provider = build_provider(&cli, &config, &project_dir)?;
    let engine = SpecEngine::new(store, provider, EngineSettings::from(&config));

    run(engine, cli.command).await
}

fn build_provider(
    cli: &Cli,
    config: &SpecflowConfig,
    project_dir: &Path,
) -> Result<Arc<dyn LlmProvider>> {
    if !cli.response_files.is_empty() {
        let responses = cli
            .response_files
            .iter()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read response file: {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(Arc::new(ScriptedProvider::new(responses)));
    }

    if !cli.command.needs_provider() {
        // Never invoked by commands that don't generate.
        return Ok(Arc::new(ScriptedProvider::default()));
    }

    let Some(provider) = &config.provider else {
        anyhow::bail!(
            "No provider configured. Add a `provider` section to specflow.yaml or pass --response-file"
        );
    };
    Ok(Arc::new(CommandProvider::new(provider.command_config(project_dir))?))
}

async fn run(engine: SpecEngine, command: Command) -> Result<()> {
    match command {
        Command::Create(args) => {
            let workflow = engine
                .create_workflow(&args.title, &args.description, args.intent, args.baseline)
                .await?;
            println!("{}", workflow.id);
        }
        Command::List(args) if args.archived => {
            let archived = engine.list_archived().await?;
            for entry in archived {
                println!("{}  {}  {}", entry.workflow_id, entry.title, entry.path.display());
            }
        }
        Command::List(args) => {
            let summaries = engine.list_workflows().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for s in summaries {
                    println!(
                        "{}  {:<11}  {:<19}  {}",
                        s.id,
                        s.status.label(),
                        s.current_phase.display_name(),
                        s.title
                    );
                }
            }
        }
        Command::Show(args) => {
            let workflow = engine.load_workflow(args.workflow_id).await?;
            match args.phase {
                Some(phase) => {
                    let doc = workflow
                        .document(phase)
                        .with_context(|| format!("No {} document yet", phase.display_name()))?;
                    println!("{}", doc.content);
                }
                None => print_overview(&workflow),
            }
        }
        Command::Generate(args) => {
            generate(&engine, args.workflow_id, args.input, args.stream).await?;
        }
        Command::Proceed(args) => {
            let workflow = engine.proceed_to_next_phase(args.workflow_id).await?;
            println!("Now at {}", workflow.current_phase.display_name());
        }
        Command::Complete(args) => {
            engine.complete_workflow(args.workflow_id).await?;
            println!("Workflow {} completed", args.workflow_id);
        }
        Command::Edit(args) => {
            let content = read_content(&args.file)?;
            let doc = engine
                .update_document(args.workflow_id, args.phase, &content)
                .await?;
            print_validation(args.phase, doc.validation_errors());
        }
        Command::History(command) => history(&engine, command).await?,
        Command::Archive(args) => {
            let record = engine.archive_workflow(args.workflow_id).await?;
            println!("Archived to {}", record.archive_path.display());
            println!("Audit log: {}", record.audit_log_path.display());
        }
        Command::Diff(args) => {
            let delta = match args.against {
                Some(baseline) => engine.compare_workflows(baseline, args.workflow_id).await?,
                None => engine.compare_with_baseline(args.workflow_id).await?,
            };
            if args.json {
                println!("{}", serde_json::to_string_pretty(&delta)?);
            } else {
                print_delta(&delta);
            }
        }
        Command::Questions(args) => {
            let questions = engine
                .clarification_questions(args.workflow_id, &args.input, args.max)
                .await?;
            if questions.is_empty() {
                println!("No clarification questions.");
            }
            for (i, question) in questions.iter().enumerate() {
                println!("{}. {}", i + 1, question);
            }
        }
        Command::Delete(args) => {
            engine.delete_workflow(args.workflow_id).await?;
            println!("Deleted {}", args.workflow_id);
        }
    }
    Ok(())
}

/// Run generation on its own task; Ctrl-C cancels it.
async fn generate(engine: &SpecEngine, id: WorkflowId, input: String, stream: bool) -> Result<()> {
    let mut handle = engine.start_generation(id, input);
    let mut cancel_requested = false;

    loop {
        tokio::select! {
            event = handle.events.recv() => {
                let Some(event) = event else { break };
                match &event {
                    GenerationEvent::Started { phase, .. } => {
                        eprintln!("Generating {}...", phase.display_name());
                    }
                    GenerationEvent::Chunk { text } if stream => {
                        eprint!("{}", text);
                        let _ = std::io::stderr().flush();
                    }
                    GenerationEvent::Cancelled { .. } => eprintln!("Cancelled."),
                    _ => {}
                }
                if event.is_terminal() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                cancel_requested = true;
                handle.cancel();
            }
        }
    }

    let doc = handle.wait().await?;
    if stream {
        eprintln!();
    }
    print_validation(doc.phase, doc.validation_errors());
    Ok(())
}

async fn history(engine: &SpecEngine, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List(args) => {
            let snapshots = engine.document_history(args.workflow_id, args.phase).await?;
            for snapshot in snapshots {
                println!(
                    "{:>4}  {}  {}  {}",
                    snapshot.sequence,
                    snapshot.id,
                    snapshot.created_at.format("%Y-%m-%d %H:%M:%S"),
                    snapshot.digest.get(..12).unwrap_or(snapshot.digest.as_str())
                );
            }
        }
        HistoryCommand::Show(args) => {
            let snapshot = engine
                .document_snapshot(args.workflow_id, args.phase, args.snapshot_id)
                .await?;
            println!("{}", snapshot.content);
        }
        HistoryCommand::Delete(args) => {
            engine
                .delete_document_snapshot(args.workflow_id, args.phase, args.snapshot_id)
                .await?;
            println!("Deleted snapshot {}", args.snapshot_id);
        }
        HistoryCommand::Prune(args) => {
            let removed = engine
                .prune_document_history(args.workflow_id, args.phase, args.keep)
                .await?;
            println!("Removed {} snapshot(s)", removed);
        }
        HistoryCommand::Restore(args) => {
            let doc = engine
                .restore_document_snapshot(args.workflow_id, args.phase, args.snapshot_id)
                .await?;
            print_validation(args.phase, doc.validation_errors());
        }
    }
    Ok(())
}

fn read_content(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("Failed to read stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_overview(workflow: &Workflow) {
    println!("{} ({})", workflow.title, workflow.id);
    println!("{}", workflow.description);
    println!(
        "Status: {}  Phase: {}",
        workflow.status.label(),
        workflow.current_phase.display_name()
    );
    if let Some(baseline) = workflow.baseline_workflow_id {
        println!("Baseline: {}", baseline);
    }
    for phase in Phase::ALL {
        let state = match workflow.document(phase) {
            None => "-".to_string(),
            Some(doc) if doc.is_valid() => "valid".to_string(),
            Some(doc) => format!("invalid ({} issue(s))", doc.validation_errors().len()),
        };
        println!("  {:<19} {}", phase.display_name(), state);
    }
}

fn print_validation(phase: Phase, errors: &[String]) {
    if errors.is_empty() {
        println!("{} saved and valid", phase.display_name());
    } else {
        println!("{} saved with validation errors:", phase.display_name());
        for error in errors {
            println!("  - {}", error);
        }
    }
}

fn print_delta(delta: &SpecDelta) {
    println!(
        "{} -> {}",
        delta.baseline_workflow_id, delta.target_workflow_id
    );
    for entry in &delta.phases {
        println!("  {:<19} {}", entry.phase.display_name(), entry.status);
    }
    if !delta.has_changes() {
        println!("No changes.");
    }
}
