use clap::{Parser, Subcommand};
use spec_workflow::domain::{ChangeIntent, WorkflowId};
use spec_workflow::phase::Phase;
use spec_workflow::storage::SnapshotId;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "specflow")]
#[command(about = "Spec-driven workflow: requirements, design and implementation plan documents")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SPECFLOW_GIT_SHA"), ")"))]
#[command(subcommand_required = true, arg_required_else_help = true)]
pub struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Config file (defaults to <project>/specflow.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Replay these files as model responses instead of running the configured provider
    #[arg(long = "response-file", global = true, value_name = "FILE")]
    pub response_files: Vec<PathBuf>,

    /// Debug logging (overridden by SPECFLOW_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a workflow at the requirements phase
    Create(CreateArgs),
    /// List active (or archived) workflows
    List(ListArgs),
    /// Show a workflow or one of its documents
    Show(ShowArgs),
    /// Generate the current phase's document
    Generate(GenerateArgs),
    /// Advance to the next phase
    Proceed(WorkflowArg),
    /// Mark a workflow completed
    Complete(WorkflowArg),
    /// Replace a phase document with edited content
    Edit(EditArgs),
    /// Inspect and manage document history
    #[command(subcommand)]
    History(HistoryCommand),
    /// Move a completed workflow into the archive
    Archive(WorkflowArg),
    /// Compare a workflow with its baseline or another workflow
    Diff(DiffArgs),
    /// Ask the model for clarification questions about the current phase
    Questions(QuestionsArgs),
    /// Delete an active workflow and its history
    Delete(WorkflowArg),
}

impl Command {
    /// Whether the command invokes the model.
    pub fn needs_provider(&self) -> bool {
        matches!(self, Command::Generate(_) | Command::Questions(_))
    }
}

#[derive(Parser, Debug)]
pub struct WorkflowArg {
    pub workflow_id: WorkflowId,
}

#[derive(Parser, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub description: String,

    /// fresh or incremental
    #[arg(long, value_name = "INTENT")]
    pub intent: Option<ChangeIntent>,

    /// Workflow this one extends (required for incremental)
    #[arg(long, value_name = "WORKFLOW_ID")]
    pub baseline: Option<WorkflowId>,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub archived: bool,

    /// Emit machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    pub workflow_id: WorkflowId,

    /// Print this phase's document instead of the overview
    #[arg(long)]
    pub phase: Option<Phase>,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    pub workflow_id: WorkflowId,

    /// Extra instructions for this phase
    #[arg(short, long, default_value = "")]
    pub input: String,

    /// Echo model output to stderr as it streams
    #[arg(long)]
    pub stream: bool,
}

#[derive(Parser, Debug)]
pub struct EditArgs {
    pub workflow_id: WorkflowId,

    #[arg(long)]
    pub phase: Phase,

    /// Markdown file with the new content, or - for stdin
    #[arg(long, value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List snapshots, newest first
    List(HistoryTarget),
    /// Print a snapshot's content
    Show(SnapshotTarget),
    /// Delete one snapshot
    Delete(SnapshotTarget),
    /// Keep only the newest snapshots
    Prune(PruneArgs),
    /// Make a snapshot's content current again
    Restore(SnapshotTarget),
}

#[derive(Parser, Debug)]
pub struct HistoryTarget {
    pub workflow_id: WorkflowId,

    #[arg(long)]
    pub phase: Phase,
}

#[derive(Parser, Debug)]
pub struct SnapshotTarget {
    pub workflow_id: WorkflowId,

    #[arg(long)]
    pub phase: Phase,

    pub snapshot_id: SnapshotId,
}

#[derive(Parser, Debug)]
pub struct PruneArgs {
    pub workflow_id: WorkflowId,

    #[arg(long)]
    pub phase: Phase,

    #[arg(long, value_name = "N")]
    pub keep: usize,
}

#[derive(Parser, Debug)]
pub struct DiffArgs {
    pub workflow_id: WorkflowId,

    /// Compare against this workflow instead of the stored baseline
    #[arg(long, value_name = "WORKFLOW_ID")]
    pub against: Option<WorkflowId>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct QuestionsArgs {
    pub workflow_id: WorkflowId,

    #[arg(short, long, default_value = "")]
    pub input: String,

    /// Maximum number of questions (defaults to the configured value)
    #[arg(long, value_name = "N")]
    pub max: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_history_prune() {
        let id = WorkflowId::new();
        let cli = Cli::try_parse_from([
            "specflow",
            "history",
            "prune",
            &id.to_string(),
            "--phase",
            "design",
            "--keep",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::History(HistoryCommand::Prune(args)) => {
                assert_eq!(args.workflow_id, id);
                assert_eq!(args.phase, Phase::Design);
                assert_eq!(args.keep, 3);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_incremental() {
        let baseline = WorkflowId::new();
        let cli = Cli::try_parse_from([
            "specflow",
            "--verbose",
            "create",
            "--title",
            "Login v2",
            "--description",
            "SSO",
            "--intent",
            "incremental",
            "--baseline",
            &baseline.to_string(),
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(!cli.command.needs_provider());
        let Command::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.intent, Some(ChangeIntent::Incremental));
        assert_eq!(args.baseline, Some(baseline));
    }

    #[test]
    fn test_bad_phase_is_rejected() {
        let id = WorkflowId::new().to_string();
        assert!(Cli::try_parse_from(["specflow", "show", &id, "--phase", "deploy"]).is_err());
    }
}
