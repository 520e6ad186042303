//! Command-line surface for editing sessions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use time::macros::format_description;

use crate::app::diff::{DiffView, summarize};
use crate::app::editor::{EditorSession, ProposeOutcome};
use crate::app::session::SelectionRecord;
use crate::infra::command::{CommandEditSource, split_command_line};
use crate::infra::config::Config;

#[derive(Parser)]
#[command(
    name = "docedit",
    author,
    version,
    about = "Edit Markdown and math documents through an external rewriting command",
    long_about = None
)]
pub struct Cli {
    /// Directory holding the document and its `.docedit/` session (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    workspace: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a session on a document, resetting its history
    Open { file: PathBuf },
    /// Locate text copied from the rendered document and make it the active selection
    Resolve {
        /// Copied text to locate
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        fragment: Option<String>,
        /// Read the copied text from a file (`-` for stdin), keeping its line breaks
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// Print the resolved range as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear the active selection
    Clear,
    /// Send an edit instruction for the selection (or whole document) to the edit command
    Propose {
        #[arg(short, long)]
        prompt: String,
        /// Edit the whole document even when a selection is active
        #[arg(long)]
        document: bool,
        /// Edit command to use instead of the configured one
        #[arg(long, value_name = "COMMAND")]
        command: Option<String>,
    },
    /// Show the pending proposal as a diff
    Diff,
    /// Apply the pending proposal to the document
    Accept,
    /// Drop the pending proposal
    Discard,
    /// Restore the previous document state
    Undo,
    /// Re-apply the next document state
    Redo,
    /// List recorded document states
    History,
    /// Show the conversation with the edit command
    Chat,
    /// Show the document, selection, and pending proposal
    Status,
    /// Generate shell completions
    Completions { shell: Shell },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        if let Commands::Completions { shell } = self.command {
            clap_complete::generate(shell, &mut Cli::command(), "docedit", &mut io::stdout());
            return Ok(());
        }

        let root = match self.workspace {
            Some(dir) => dir,
            None => std::env::current_dir().context("unable to determine working directory")?,
        };
        let config = Config::load(&root)?;

        if let Commands::Open { file } = &self.command {
            let session = EditorSession::open(config, &root, file)?;
            println!(
                "Opened {} ({} history slots)",
                session.document_path().display(),
                session.history().limit()
            );
            return Ok(());
        }

        let mut session = EditorSession::load(config, &root)?;
        match self.command {
            Commands::Resolve {
                fragment,
                file,
                json,
            } => {
                let fragment = match (fragment, file) {
                    (Some(fragment), _) => fragment,
                    (None, Some(path)) => read_fragment(&path)?,
                    (None, None) => return Err(anyhow!("a fragment or --file is required")),
                };
                resolve(&mut session, &fragment, json)
            }
            Commands::Clear => {
                session.clear_selection()?;
                println!("Selection cleared.");
                Ok(())
            }
            Commands::Propose {
                prompt,
                document,
                command,
            } => propose(&mut session, &prompt, document, command),
            Commands::Diff => {
                match session.diff() {
                    Some(view) => print_diff(&view),
                    None => println!("No pending proposal."),
                }
                Ok(())
            }
            Commands::Accept => {
                let updated = session.accept()?;
                println!(
                    "Applied proposal to {} ({} bytes).",
                    session.document_path().display(),
                    updated.len()
                );
                Ok(())
            }
            Commands::Discard => {
                if session.discard()? {
                    println!("Proposal discarded.");
                } else {
                    println!("No pending proposal.");
                }
                Ok(())
            }
            Commands::Undo => {
                match session.undo()? {
                    Some(entry) => println!("Undid to: {}", entry.label),
                    None => println!("Nothing to undo."),
                }
                Ok(())
            }
            Commands::Redo => {
                match session.redo()? {
                    Some(entry) => println!("Redid: {}", entry.label),
                    None => println!("Nothing to redo."),
                }
                Ok(())
            }
            Commands::History => print_history(&session),
            Commands::Chat => {
                for message in session.chat() {
                    println!("[{:?}] {}", message.role, message.content);
                }
                Ok(())
            }
            Commands::Status => {
                print_status(&session);
                Ok(())
            }
            Commands::Open { .. } | Commands::Completions { .. } => Ok(()),
        }
    }
}

fn read_fragment(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        return io::read_to_string(io::stdin()).context("failed to read fragment from stdin");
    }
    fs::read_to_string(path)
        .with_context(|| format!("failed to read fragment from {}", path.display()))
}

fn resolve(session: &mut EditorSession, fragment: &str, json: bool) -> Result<()> {
    let resolved = session.select(fragment)?;
    match (resolved, json) {
        (Some(resolution), true) => {
            let record = SelectionRecord::from(&resolution);
            let data = serde_json::to_string_pretty(&record)
                .context("failed to serialize resolved selection")?;
            println!("{data}");
        }
        (Some(resolution), false) => {
            let range = &resolution.range;
            println!("{} match at {}..{}", resolution.tier, range.start, range.end);
            println!("{}", range.text);
        }
        (None, true) => println!("null"),
        (None, false) => {
            eprintln!("Selection could not be matched to the document; reselect and try again.")
        }
    }
    Ok(())
}

fn propose(
    session: &mut EditorSession,
    prompt: &str,
    whole_document: bool,
    command: Option<String>,
) -> Result<()> {
    let command = match command {
        Some(line) => split_command_line(&line).context("invalid --command")?,
        None => session
            .config()
            .edit
            .command()
            .map(<[String]>::to_vec)
            .ok_or_else(|| {
                anyhow!("no edit command configured; set [edit].command or DOCEDIT_EDIT_COMMAND")
            })?,
    };
    let source = CommandEditSource::new(&command)?;

    match session.propose(&source, prompt, whole_document)? {
        ProposeOutcome::Proposed(view) => {
            print_diff(&view);
            println!("Run `docedit accept` to apply or `docedit discard` to drop it.");
        }
        ProposeOutcome::Rejected(reason) => println!("Edit command declined: {reason}"),
    }
    Ok(())
}

fn print_diff(view: &DiffView) {
    print!("{}", view.rendered);
    println!("{}", summarize(&view.stats));
}

fn print_history(session: &EditorSession) -> Result<()> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let history = session.history();
    for (index, entry) in history.entries().enumerate() {
        let marker = if index == history.position() { '*' } else { ' ' };
        let at = entry
            .at
            .format(format)
            .context("failed to format history timestamp")?;
        println!("{marker} {index:>2}  {at}  {}", entry.label);
    }
    Ok(())
}

fn print_status(session: &EditorSession) {
    println!("Document: {}", session.document_path().display());
    match session.selection() {
        Some(resolution) => println!(
            "Selection: {}..{} ({})",
            resolution.range.start, resolution.range.end, resolution.tier
        ),
        None => println!("Selection: none"),
    }
    match session.proposal() {
        Some(proposal) => println!(
            "Proposal: pending for {} ({})",
            proposal.scope.label(),
            proposal.prompt
        ),
        None => println!("Proposal: none"),
    }
    let history = session.history();
    println!(
        "History: {}/{} (limit {})",
        history.position() + 1,
        history.len(),
        history.limit()
    );
}
