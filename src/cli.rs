//! Command-line interface implementation for project-tools.
//! Provides argument parsing and dispatches every subcommand.

use crate::compile::template::locale::LocaleRequest;
use crate::compile::Selection;
use crate::error::Result;
use crate::project::{git_author, init, Project};
use crate::prompt::get_prompter;
use crate::{server, watch};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments structure for project-tools.
#[derive(Parser, Debug)]
#[command(author, version, about = "project: manage a repo of projects and compile their assets", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repo root, defaults to the current directory
    #[arg(short, long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Create a new repo of projects
    Init {
        /// Name of the repo
        name: Option<String>,
        /// Where to create it, defaults to the name
        location: Option<PathBuf>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Create a new project
    Create {
        name: String,
    },
    /// Compile a project into its dist folder
    Build {
        /// Project to build, defaults to the current project
        name: Option<String>,
        /// Locales to build: `all` or a comma separated list
        #[arg(short, long)]
        locales: Option<String>,
        /// Files to build, relative to the project's app folder
        #[arg(short, long, default_value = "**/*")]
        glob: String,
    },
    /// Build a project and rebuild it when files change
    Watch {
        name: Option<String>,
        #[arg(short, long)]
        locales: Option<String>,
    },
    /// List projects, optionally those containing FILTER
    #[command(visible_alias = "ls")]
    List {
        filter: Option<String>,
    },
    /// Make a project the current one
    Use {
        name: String,
    },
    /// Start the serving container
    Start {
        /// Replace a running container
        #[arg(short, long)]
        force: bool,
    },
    /// Stop the serving container
    Stop,
    /// Report whether the serving container is running
    Status,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Returns
/// * `Args` - Parsed command line arguments
///
/// # Exits
/// * With status code 1 and the help text if no subcommand is given
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if matches!(
                e.kind(),
                ErrorKind::MissingSubcommand
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}

fn locale_request(project: &Project, locales: Option<&str>) -> LocaleRequest {
    match locales {
        Some(locales) => LocaleRequest::parse(locales),
        None => project.settings().default_build_locales.clone(),
    }
}

/// Runs the parsed command.
pub fn run(args: Args) -> Result<()> {
    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    match args.command {
        Commands::Init { name, location, yes } => {
            let prompter = get_prompter(yes);
            let default_name = root
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = match name {
                Some(name) => name,
                None => prompter.input("Repo name", &default_name)?,
            };
            let location = location.unwrap_or_else(|| PathBuf::from(&name));
            let location = if location.is_absolute() { location } else { root.join(location) };
            if !prompter.confirm(&format!("Create '{}' in {}?", name, location.display()), true)? {
                return Ok(());
            }
            init(&name, &location, git_author())?;
        }
        Commands::Create { name } => {
            Project::open(&root)?.create(&name)?;
        }
        Commands::Build { name, locales, glob } => {
            let project = Project::open(&root)?;
            let name = project.resolve(name.as_deref())?;
            let locales = locale_request(&project, locales.as_deref());
            let written = project.build(&name, &Selection::Pattern(glob), Some(&locales))?;
            println!("Built '{}': {} files", name, written.len());
        }
        Commands::Watch { name, locales } => {
            let project = Project::open(&root)?;
            let name = project.resolve(name.as_deref())?;
            let locales = locale_request(&project, locales.as_deref());
            watch::watch(&project, &name, &locales)?;
        }
        Commands::List { filter } => {
            let project = Project::open(&root)?;
            let current = project.current()?;
            for name in project.list(filter.as_deref())? {
                let marker = if current.as_deref() == Some(name.as_str()) { "*" } else { " " };
                println!("{marker} {name}");
            }
        }
        Commands::Use { name } => {
            Project::open(&root)?.use_project(&name)?;
        }
        Commands::Start { force } => {
            let project = Project::open(&root)?;
            let projects = project.list(None)?;
            server::start(project.root(), &projects, &project.settings().server, force)?;
        }
        Commands::Stop => {
            let project = Project::open(&root)?;
            server::stop(&project.settings().server)?;
        }
        Commands::Status => {
            let project = Project::open(&root)?;
            let running = server::status(&project.settings().server)?;
            println!("server is {}", if running { "running" } else { "not running" });
        }
    }
    Ok(())
}

