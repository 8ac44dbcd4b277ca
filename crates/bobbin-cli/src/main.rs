//! bobbin - シェルコマンドを input 行ごとに実行する CLI
//!
//! # 使い方
//! ```text
//! bobbin --store ./state run --inputs urls.txt -- curl -fsS '$1'
//! bobbin --store ./state status exec-01J...
//! bobbin --store ./state resume exec-01J... -- curl -fsS '$1'
//! ```
//!
//! command は `sh -c` で実行され、input は `$1` と `BOBBIN_INPUT` で渡される。
//! 終了コードが 0 以外なら task 失敗として扱う。

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bobbin_core::impls::FileSystemExecutionStore;
use bobbin_core::{Bobbin, ExecutionId, ExecutorConfig, TaskFailure, TaskFunction};
use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bobbin",
    version,
    about = "Resumable batch runner: one shell command per input line"
)]
struct Cli {
    /// Directory holding execution state
    #[arg(long, env = "BOBBIN_STORE_DIR", default_value = ".bobbin")]
    store: PathBuf,

    /// Increase log verbosity (-v: debug, -vv: trace). RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a new execution over the lines of an input file
    Run {
        /// Input file, one input per line ("-" for stdin). Lines are trimmed and blank lines skipped
        #[arg(short, long)]
        inputs: PathBuf,

        #[command(flatten)]
        executor: ExecutorArgs,

        /// Command run through `sh -c` for each input
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Continue a past execution under a new id
    Resume {
        execution_id: ExecutionId,

        #[command(flatten)]
        executor: ExecutorArgs,

        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Show the merged state of an execution
    Status {
        execution_id: ExecutionId,

        /// Print the full state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recorded task failures of an execution, oldest first
    Exceptions {
        execution_id: ExecutionId,

        /// Only the last N records
        #[arg(long)]
        tail: Option<usize>,
    },
    /// List executions in the store, newest first
    List,
}

#[derive(Args, Debug)]
struct ExecutorArgs {
    /// Number of concurrent workers (default: available parallelism)
    #[arg(short, long, env = "BOBBIN_WORKERS")]
    workers: Option<usize>,

    /// Failures a worker tolerates before giving up
    #[arg(long, env = "BOBBIN_MAX_WORKER_RETRIES")]
    max_worker_retries: Option<u32>,

    /// Successful inputs between checkpoints
    #[arg(long, env = "BOBBIN_EXECUTIONS_BEFORE_FLUSH")]
    executions_before_flush: Option<usize>,

    /// Do not record task failures
    #[arg(long, env = "BOBBIN_NO_STORE_EXCEPTIONS")]
    no_store_exceptions: bool,
}

impl ExecutorArgs {
    fn to_config(&self) -> ExecutorConfig {
        let mut config = ExecutorConfig::default();
        if let Some(workers) = self.workers {
            config.number_of_workers = workers;
        }
        if let Some(retries) = self.max_worker_retries {
            config = config.with_max_worker_retries(retries);
        }
        if let Some(flush) = self.executions_before_flush {
            config = config.with_executions_before_flush(flush);
        }
        config.with_store_exceptions(!self.no_store_exceptions)
    }
}

/// Runs one shell command per input.
struct ShellCommand {
    script: String,
}

impl ShellCommand {
    fn new(words: &[String]) -> Self {
        Self {
            script: words.join(" "),
        }
    }
}

#[async_trait]
impl TaskFunction<String> for ShellCommand {
    async fn call(&self, input: &String) -> Result<(), TaskFailure> {
        debug!(input = %input, "running command");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.script)
            .arg("bobbin")
            .arg(input)
            .env("BOBBIN_INPUT", input)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(TaskFailure::from_error)?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        Err(match output.status.code() {
            Some(code) if stderr.is_empty() => TaskFailure::new(format!("exit status {code}")),
            Some(code) => TaskFailure::new(format!("exit status {code}: {stderr}")),
            None => TaskFailure::new(format!("terminated by signal: {stderr}")),
        })
    }
}

async fn read_inputs(path: &Path) -> Result<Vec<String>> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("failed to read inputs from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read inputs from {}", path.display()))?
    };
    Ok(parse_inputs(&raw))
}

/// One input per line, surrounding whitespace trimmed, blank lines skipped.
fn parse_inputs(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn print_summary(bobbin: &Bobbin<String>, execution_id: ExecutionId) -> Result<()> {
    let state = bobbin.get_state(execution_id).await?;
    println!("{execution_id}");
    println!("finished:   {}", state.finished_inputs.len());
    println!("unfinished: {}", state.unfinished_inputs.len());
    if !state.is_complete() {
        let exceptions = bobbin.get_exceptions(execution_id).await?;
        println!("exceptions: {}", exceptions.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            inputs,
            executor,
            command,
        } => {
            let inputs = read_inputs(&inputs).await?;
            info!(inputs = inputs.len(), store = %cli.store.display(), "loaded inputs");
            let bobbin = Bobbin::local_multithread(&cli.store, executor.to_config());
            let execution_id = bobbin
                .start_from_scratch(inputs, Arc::new(ShellCommand::new(&command)))
                .await?;
            print_summary(&bobbin, execution_id).await?;
        }
        Commands::Resume {
            execution_id,
            executor,
            command,
        } => {
            let bobbin = Bobbin::local_multithread(&cli.store, executor.to_config());
            let new_execution_id = bobbin
                .start_from_past_execution(execution_id, Arc::new(ShellCommand::new(&command)))
                .await
                .with_context(|| format!("failed to resume {execution_id}"))?;
            print_summary(&bobbin, new_execution_id).await?;
        }
        Commands::Status { execution_id, json } => {
            let bobbin = Bobbin::<String>::local_multithread(&cli.store, ExecutorConfig::default());
            if json {
                let state = bobbin.get_state(execution_id).await?;
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_summary(&bobbin, execution_id).await?;
            }
        }
        Commands::Exceptions { execution_id, tail } => {
            let bobbin = Bobbin::<String>::local_multithread(&cli.store, ExecutorConfig::default());
            let exceptions = bobbin.get_exceptions(execution_id).await?;
            let skip = tail.map_or(0, |n| exceptions.len().saturating_sub(n));
            for exception in exceptions.iter().skip(skip) {
                println!("{}", serde_json::to_string(exception)?);
            }
        }
        Commands::List => {
            let store = FileSystemExecutionStore::new(&cli.store);
            if !store.root().exists() {
                bail!("store directory {} does not exist", store.root().display());
            }
            for execution_id in store.list_executions().await? {
                println!("{execution_id}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_are_trimmed_and_blank_lines_skipped() {
        let raw = "  a b \n\n\tc\r\n   \nd";
        assert_eq!(parse_inputs(raw), vec!["a b", "c", "d"]);
    }

    #[test]
    fn executor_flags_override_defaults() {
        let cli = Cli::parse_from([
            "bobbin",
            "run",
            "--inputs",
            "in.txt",
            "--workers",
            "3",
            "--max-worker-retries",
            "7",
            "--no-store-exceptions",
            "--",
            "echo",
        ]);
        let Commands::Run { executor, command, .. } = cli.command else {
            panic!("expected run");
        };
        let config = executor.to_config();
        assert_eq!(config.number_of_workers, 3);
        assert_eq!(config.max_worker_retries, 7);
        assert!(!config.store_exceptions);
        assert_eq!(command, vec!["echo"]);
    }
}
