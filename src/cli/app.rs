//! Main CLI application

use crate::error::Result;
use crate::quakefile::{find_quakefile, load_quakefile, QuakeFile};
use crate::runner::{Context, Evaluator, Verbosity, DEFAULT_TASK};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// Separator between task invocations on the command line
const GROUP_SEPARATOR: &str = "--";

/// Build the clap command
pub fn build_cli() -> Command {
    Command::new("quake")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A declarative task runner driven by Quakefiles")
        .override_usage("quake [OPTIONS] [TASK [ARGS...]] [-- TASK [ARGS...]]...")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to the Quakefile")
                .env("QUAKEFILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List available tasks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-ast")
                .long("dump-ast")
                .value_name("FORMAT")
                .help("Print the parsed Quakefile and exit")
                .value_parser(["json", "yaml"]),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .help("Print a shell completion script and exit")
                .value_parser(value_parser!(Shell)),
        )
        .arg(
            Arg::new("tasks")
                .value_name("TASK")
                .help("Task to run, followed by its arguments")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Split raw arguments on `--`.
///
/// The first group (program name and options) is handed to clap; every
/// later group is one task invocation. Empty groups are dropped.
pub fn split_task_groups(args: &[String]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut groups = args.split(|arg| arg == GROUP_SEPARATOR);
    let head = groups.next().map(<[String]>::to_vec).unwrap_or_default();
    let rest = groups
        .filter(|group| !group.is_empty())
        .map(<[String]>::to_vec)
        .collect();
    (head, rest)
}

/// Whether `-v`/`--verbose` appears among the options, before the first task.
///
/// Used to pick the log filter before clap runs; arguments after a task
/// name belong to the task.
pub fn verbose_requested(args: &[String]) -> bool {
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => return true,
            "-f" | "--file" | "--dump-ast" | "--completions" => {
                iter.next();
            }
            GROUP_SEPARATOR => return false,
            long if long.starts_with("--") => {}
            short if short.starts_with('-') && short.len() > 1 => {
                for c in short[1..].chars() {
                    match c {
                        'v' => return true,
                        // `-f` takes the rest of the cluster, or the next argument
                        'f' => {
                            if short.ends_with('f') {
                                iter.next();
                            }
                            break;
                        }
                        _ => {}
                    }
                }
            }
            _ => return false,
        }
    }
    false
}

/// Render the `--list` output
pub fn format_task_list(file: &QuakeFile, verbose: bool) -> String {
    let mut out = String::from("Available tasks:\n");
    for (name, task) in file.qualified_tasks() {
        let mut line = format!("  {:<20} {}", name, task.summary().unwrap_or_default());
        if verbose {
            if let Some(source) = &task.source_file {
                line.push_str(&format!("  ({})", source));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<()> {
    run_from(std::env::args().collect())
}

/// Run the CLI application with provided arguments
pub fn run_from(args: Vec<String>) -> Result<()> {
    let (head, mut groups) = split_task_groups(&args);
    let mut command = build_cli();
    let matches = command.clone().get_matches_from(head);

    if let Some(shell) = matches.get_one::<Shell>("completions") {
        clap_complete::generate(*shell, &mut command, "quake", &mut io::stdout());
        return Ok(());
    }

    let path = match matches.get_one::<PathBuf>("file") {
        Some(path) => path.clone(),
        None => find_quakefile()?,
    };
    debug!(path = %path.display(), "loading quakefile");
    let file = load_quakefile(&path)?;

    if let Some(format) = matches.get_one::<String>("dump-ast") {
        let dump = match format.as_str() {
            "yaml" => serde_yaml::to_string(&file)?,
            _ => serde_json::to_string_pretty(&file)?,
        };
        println!("{}", dump.trim_end());
        return Ok(());
    }

    let verbosity = get_verbosity(&matches);

    if matches.get_flag("list") {
        print!("{}", format_task_list(&file, verbosity == Verbosity::Verbose));
        return Ok(());
    }

    if let Some(first) = matches.get_many::<String>("tasks") {
        groups.insert(0, first.cloned().collect());
    }

    let ctx = Context::new()
        .with_quakefile_path(path)
        .with_verbosity(verbosity);
    let mut evaluator = Evaluator::with_context(file, ctx);

    if groups.is_empty() {
        evaluator.run_task(DEFAULT_TASK)?;
        return Ok(());
    }

    for group in &groups {
        if let Some((name, task_args)) = group.split_first() {
            evaluator.run_task_with_args(name, task_args)?;
        }
    }

    Ok(())
}
