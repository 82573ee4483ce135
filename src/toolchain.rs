//! Command lines for the compiler, linker, archiver and dependency scanner,
//! and running them through the shell.

use crate::discover::relative_path;
use crate::error::{Error, Result};
use crate::project::{Project, TargetType};
use std::borrow::Cow;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::{debug, info};

/// Where headers the compiler can't find are looked for when the local
/// config file is first written.
pub const EXTRA_INCLUDE_PATHS: &[&str] = &["/opt/local/include", "/usr/local/include"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Success,
    Interrupted,
    Failure,
}

/// The outcome of a finished command.
#[derive(Debug)]
pub struct Captured {
    pub termination: Termination,
    /// How the command ended, e.g. "exit 1" or "signal 9".
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

fn describe(status: ExitStatus) -> (Termination, String) {
    if status.success() {
        return (Termination::Success, "exit 0".to_string());
    }
    if let Some(code) = status.code() {
        return (Termination::Failure, format!("exit {}", code));
    }
    match status.signal() {
        Some(libc::SIGINT) => (Termination::Interrupted, "interrupted".to_string()),
        Some(sig) => (Termination::Failure, format!("signal {}", sig)),
        None => (Termination::Failure, "unknown status".to_string()),
    }
}

/// Runs `command` with /bin/sh in `dir`, capturing both output streams.
pub fn capture(command: &str, dir: &str) -> Result<Captured> {
    info!("{}", command);
    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .current_dir(dir)
        .output()?;
    let (termination, status) = describe(output.status);
    Ok(Captured {
        termination,
        status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

impl Captured {
    /// Turns anything but success into CommandFailed.
    pub fn check(self, command: &str) -> Result<Captured> {
        if self.termination == Termination::Success {
            return Ok(self);
        }
        let mut output = self.stderr;
        output.push_str(&self.stdout);
        Err(Error::CommandFailed {
            command: command.to_string(),
            status: self.status,
            output,
        })
    }
}

/// Runs `command`, failing unless it exits successfully.
pub fn shell(command: &str, dir: &str) -> Result<Captured> {
    capture(command, dir)?.check(command)
}

/// Fails with MissingTool unless the program a command line starts with can be
/// found.
pub fn check_tool(command: &str) -> Result<()> {
    let program = command.split_whitespace().next().unwrap_or("");
    if program.is_empty() || which::which(program).is_err() {
        return Err(Error::MissingTool(program.to_string()));
    }
    Ok(())
}

/// Quotes one argument for /bin/sh.  Paths can't hold a NUL, the only thing
/// that can't be quoted.
pub fn quote(arg: &str) -> Cow<'_, str> {
    shlex::try_quote(arg).unwrap_or(Cow::Borrowed(arg))
}

fn quote_all(args: &[String]) -> String {
    args.iter()
        .map(|arg| quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `-I` flags, relative to the project root where commands run.
pub fn include_flags(include_paths: &[String], root: &str) -> String {
    include_paths
        .iter()
        .map(|path| quote(&format!("-I{}", relative_path(path, root))).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn compiler_flags(include_paths: &[String], options: &[String], root: &str) -> String {
    let mut flags = include_flags(include_paths, root);
    for option in options {
        if !flags.is_empty() {
            flags.push(' ');
        }
        flags.push_str(option);
    }
    flags
}

pub fn compile_command(compiler: &str, flags: &str, source: &str, object: &str) -> String {
    let mut command = format!("{} -c", compiler);
    if !flags.is_empty() {
        command.push(' ');
        command.push_str(flags);
    }
    format!("{} -o {} {}", command, quote(object), quote(source))
}

fn link_flags(project: &Project) -> String {
    let mut flags: Vec<String> = project.linker_options.clone();
    flags.extend(
        project
            .library_paths
            .iter()
            .map(|path| quote(&format!("-L{}", path)).into_owned()),
    );
    flags.extend(
        project
            .library_dependencies
            .iter()
            .map(|lib| format!("-l{}", lib)),
    );
    flags.join(" ")
}

/// The commands that turn the objects into the target.
pub fn build_commands(project: &Project) -> Vec<String> {
    let objects = quote_all(&project.objects());
    let target = quote(&project.target);
    let flags = link_flags(project);
    let with_flags = |command: String| {
        if flags.is_empty() {
            command
        } else {
            format!("{} {}", command, flags)
        }
    };
    match project.target_type {
        TargetType::Executable => vec![with_flags(format!(
            "{} -o {} {}",
            project.linker, target, objects
        ))],
        TargetType::StaticLibrary => vec![
            format!("{} -cq {} {}", project.ar, target, objects),
            format!("{} {}", project.ranlib, target),
        ],
        TargetType::SharedLibrary => vec![with_flags(format!(
            "{} -shared -o {} {}",
            project.linker, target, objects
        ))],
    }
}

/// The scanner command line.  Sources are named relative to the project root,
/// so the listing names objects the same way.
pub fn dependency_command(project: &Project, include_paths: &[String]) -> String {
    let sources: Vec<String> = project
        .sources
        .iter()
        .map(|source| project.scanner_source(source))
        .collect();
    format!(
        "{} -f- -- {} -- {}",
        project.dependency_scanner,
        include_flags(include_paths, &project.root),
        quote_all(&sources)
    )
}

/// The include directories listed in a compiler's verbose preprocessor
/// output, between "#include <...> search starts here:" and "End of search
/// list.".  Framework directories are skipped.
pub fn search_list(output: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut collecting = false;
    for line in output.lines() {
        if line.starts_with("#include <...> search starts here:") {
            collecting = true;
        } else if line.starts_with("End of search list.") {
            collecting = false;
        } else if collecting && !line.ends_with("(framework directory)") {
            paths.push(line.trim().to_string());
        }
    }
    paths
}

/// The compiler's built-in include directories for `language`.  Empty when
/// the compiler can't be asked.
pub fn default_include_paths(compiler: &str, language: &str, dir: &str) -> Vec<String> {
    let command = format!("echo | {} -v -x {} -E -", compiler, quote(language));
    match capture(&command, dir) {
        Ok(out) => search_list(&out.stderr),
        Err(err) => {
            debug!("no default include paths from {}: {}", compiler, err);
            Vec::new()
        }
    }
}

/// The first of `candidates` holding each header, without repeats.  Headers
/// found nowhere are left out.
pub fn locate_headers(headers: &[String], candidates: &[&str]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for header in headers {
        let dir = candidates
            .iter()
            .find(|dir| Path::new(dir).join(header).is_file());
        if let Some(dir) = dir {
            if !found.iter().any(|f| f == dir) {
                found.push(dir.to_string());
            }
        }
    }
    found
}

/// Headers the scanner reported it could not find.
pub fn missing_headers(diagnostics: &str) -> Vec<String> {
    const MARKER: &str = "cannot find include file \"";
    let mut missing = Vec::new();
    for line in diagnostics.lines() {
        if let Some(start) = line.find(MARKER) {
            let rest = &line[start + MARKER.len()..];
            if let Some(end) = rest.find('"') {
                let header = rest[..end].to_string();
                if !missing.contains(&header) {
                    missing.push(header);
                }
            }
        }
    }
    missing
}
