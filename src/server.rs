//! Serving container lifecycle through the `docker` command.
//!
//! One container (named by `server.name`) serves `projects/` with each
//! project's `dist` folder mounted at `/<project>`.

use crate::command::find_program;
use crate::config::ServerOptions;
use crate::constants::{DIST_DIR, PROJECTS_DIR};
use crate::error::{Error, Result};
use log::{debug, info};
use std::path::Path;
use std::process::Command;

const DOCKER: &str = "docker";

fn docker(args: &[String]) -> Result<String> {
    let command = format!("{DOCKER} {}", args.join(" "));
    debug!("Running {}", command);
    let program = find_program(DOCKER, "see https://docs.docker.com/engine/installation/")?;
    let output = Command::new(program).args(args).output().map_err(|e| Error::CommandError {
        command: command.clone(),
        message: e.to_string(),
    })?;
    if !output.status.success() {
        return Err(Error::CommandError {
            command,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Arguments of the `docker run` call serving `projects`.
pub fn run_args(root: &Path, projects: &[String], options: &ServerOptions) -> Vec<String> {
    let mut args = vec!["run".to_string(), "--detach".to_string()];
    for port in &options.ports {
        args.extend(["--publish".to_string(), port.clone()]);
    }
    args.extend(["--name".to_string(), options.name.clone()]);
    for env in &options.env {
        args.extend(["--env".to_string(), env.clone()]);
    }
    let projects_dir = root.join(PROJECTS_DIR);
    args.extend([
        "--volume".to_string(),
        format!("{}:/usr/share/nginx/html", projects_dir.display()),
    ]);
    for project in projects {
        args.extend([
            "--volume".to_string(),
            format!(
                "{}:/usr/share/nginx/html/{project}",
                projects_dir.join(project).join(DIST_DIR).display()
            ),
        ]);
    }
    args.extend([
        "--volume".to_string(),
        format!("{}:/var/log/nginx", root.join("logs").display()),
        options.image.clone(),
    ]);
    args
}

/// Whether `docker ps --all` output lists a container called `name`.
pub fn is_listed(ps_output: &str, name: &str) -> bool {
    ps_output
        .lines()
        .skip(1)
        .filter_map(|line| line.split("  ").filter(|column| !column.trim().is_empty()).last())
        .any(|column| column.trim() == name)
}

/// Whether the serving container exists.
pub fn status(options: &ServerOptions) -> Result<bool> {
    let output = docker(&["ps".to_string(), "--all".to_string()])?;
    Ok(is_listed(&output, &options.name))
}

/// Starts the serving container for `projects`.
///
/// # Arguments
/// * `root` - Repo root holding `projects/`
/// * `projects` - Projects whose `dist` folder is mounted
/// * `options` - Image, container name, ports and environment
/// * `force` - Replace a container that is already running
///
/// # Returns
/// * `Result<bool>` - `false` when a container was already running and `force` was not set
pub fn start(root: &Path, projects: &[String], options: &ServerOptions, force: bool) -> Result<bool> {
    if force {
        stop(options)?;
    } else if status(options)? {
        info!("server is already running");
        return Ok(false);
    }
    std::fs::create_dir_all(root.join("logs"))?;
    docker(&run_args(root, projects, options))?;
    info!("server was started http://localhost");
    Ok(true)
}

/// Removes the serving container. Returns `false` when it was not running.
pub fn stop(options: &ServerOptions) -> Result<bool> {
    if !status(options)? {
        info!("server isn't running");
        return Ok(false);
    }
    docker(&["rm".to_string(), "--force".to_string(), options.name.clone()])?;
    if status(options)? {
        return Err(Error::CommandError {
            command: format!("{DOCKER} rm --force {}", options.name),
            message: "failed to stop server".to_string(),
        });
    }
    info!("server was stopped");
    Ok(true)
}
