//! The actions behind a project's tasks.

use crate::depfile::{self, ObjectDeps};
use crate::discover::{expand_all_with_root, find_files, glob_base, is_glob, relative_path};
use crate::error::Error;
use crate::fs::FileSystem;
use crate::graph::{Enhancements, Graph};
use crate::local_config::LocalConfig;
use crate::project::{Project, TargetType};
use crate::toolchain::{self, Captured};
use anyhow::{anyhow, Context};
use std::cell::{Cell, RefCell};
use std::path::Path;
use tracing::{debug, info};

pub struct Builder {
    project: Project,
    environment_checked: Cell<bool>,
    /// Settings from the local config file, once loaded.
    local: RefCell<Option<LocalConfig>>,
    /// The compiler's own include directories, once asked for.
    default_includes: RefCell<Option<Vec<String>>>,
}

impl Builder {
    pub fn new(project: Project) -> Self {
        Builder {
            project,
            environment_checked: Cell::new(false),
            local: RefCell::new(None),
            default_includes: RefCell::new(None),
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Project include paths followed by local ones.
    pub fn include_paths(&self) -> Vec<String> {
        let mut paths = self.project.include_paths.clone();
        if let Some(local) = &*self.local.borrow() {
            for path in expand_all_with_root(&local.include_paths, &self.project.root) {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    pub fn compiler_flags(&self) -> String {
        let mut options = self.project.compilation_options.clone();
        if let Some(local) = &*self.local.borrow() {
            for option in &local.compilation_options {
                if !options.contains(option) {
                    options.push(option.clone());
                }
            }
        }
        toolchain::compiler_flags(&self.include_paths(), &options, &self.project.root)
    }

    /// Include paths for the dependency scanner, which doesn't know where the
    /// compiler keeps its own headers.
    pub fn scanner_include_paths(&self) -> Vec<String> {
        let mut paths = self.include_paths();
        let mut defaults = self.default_includes.borrow_mut();
        let defaults = defaults.get_or_insert_with(|| {
            let p = &self.project;
            toolchain::default_include_paths(&p.compiler, p.language.name, &p.root)
        });
        for path in defaults.iter() {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    /// Checks that the tools the build needs are installed.
    pub fn check_environment(&self) -> anyhow::Result<()> {
        if self.environment_checked.get() {
            return Ok(());
        }
        let p = &self.project;
        toolchain::check_tool(&p.compiler)?;
        match p.target_type {
            TargetType::StaticLibrary => {
                toolchain::check_tool(&p.ar)?;
                toolchain::check_tool(&p.ranlib)?;
            }
            _ => toolchain::check_tool(&p.linker)?,
        }
        self.environment_checked.set(true);
        Ok(())
    }

    /// Loads the local config unless that already happened, writing it first
    /// if it doesn't exist.
    fn ensure_local_config(&self) -> anyhow::Result<()> {
        if self.local.borrow().is_some() {
            return Ok(());
        }
        if !Path::new(&self.project.local_config_file).exists() {
            self.create_local_config()?;
        }
        self.load_local_config()
    }

    /// What compiling and linking need, whichever task asked for them.
    fn prepare(&self) -> anyhow::Result<()> {
        self.check_environment()?;
        self.ensure_local_config()
    }

    pub fn compile(&self, source: &str, object: &str) -> anyhow::Result<()> {
        self.prepare()?;
        debug!("compiling {}", source);
        let command =
            toolchain::compile_command(&self.project.compiler, &self.compiler_flags(), source, object);
        toolchain::shell(&command, &self.project.root)?;
        Ok(())
    }

    /// Links (or archives) the objects into the target.
    pub fn build(&self) -> anyhow::Result<()> {
        self.prepare()?;
        let target = &self.project.target;
        remove_if_present(target)?;
        for command in toolchain::build_commands(&self.project) {
            toolchain::shell(&command, &self.project.root)?;
        }
        if !Path::new(target).exists() {
            return Err(Error::TargetNotCreated(target.clone()).into());
        }
        Ok(())
    }

    /// Writes the local config, adding the include paths that hold headers
    /// the scanner can't otherwise find.
    pub fn create_local_config(&self) -> anyhow::Result<()> {
        // Projects sharing a directory share the file; the first one writes it.
        if Path::new(&self.project.local_config_file).exists() {
            return Ok(());
        }
        debug!("creating {}", self.project.local_config_file);
        let (_, out) = self.scan()?;
        let missing = toolchain::missing_headers(&out.stderr);
        let config = LocalConfig {
            include_paths: toolchain::locate_headers(&missing, toolchain::EXTRA_INCLUDE_PATHS),
            ..LocalConfig::default()
        };
        config.save(&self.project.local_config_file)?;
        Ok(())
    }

    pub fn load_local_config(&self) -> anyhow::Result<()> {
        let config = LocalConfig::load(&self.project.local_config_file)?;
        *self.local.borrow_mut() = Some(config);
        Ok(())
    }

    /// Runs the dependency scanner, returning its command line and output.
    fn scan(&self) -> anyhow::Result<(String, Captured)> {
        let p = &self.project;
        toolchain::check_tool(&p.dependency_scanner)?;
        let command = toolchain::dependency_command(p, &self.scanner_include_paths());
        let out = toolchain::capture(&command, &p.root)?;
        Ok((command, out))
    }

    /// Runs the dependency scanner over every source, writing its listing.
    pub fn create_dependency_file(&self) -> anyhow::Result<()> {
        self.ensure_local_config()?;
        let p = &self.project;
        if let Some(dir) = Path::new(&p.dependency_file).parent() {
            std::fs::create_dir_all(dir)?;
        }
        debug!("analysing dependencies");
        let (command, out) = self.scan()?;
        let missing = toolchain::missing_headers(&out.stderr);
        if !missing.is_empty() {
            return Err(Error::MissingHeaders(missing).into());
        }
        let out = out.check(&command)?;
        std::fs::write(&p.dependency_file, out.stdout)?;
        Ok(())
    }

    /// Reads the dependency listing, regenerating it once if it was written
    /// for a different layout.
    pub fn load_dependencies(&self, fs: &dyn FileSystem) -> anyhow::Result<ObjectDeps> {
        let p = &self.project;
        let source_to_object = p.source_to_object();
        let deps = match depfile::read(fs, &p.dependency_file, &source_to_object) {
            Err(Error::StaleDependencyFormat { reason, .. }) => {
                info!("regenerating {}: {}", p.dependency_file, reason);
                remove_if_present(&p.dependency_file)?;
                self.create_dependency_file()?;
                depfile::read(fs, &p.dependency_file, &source_to_object)?
            }
            result => result?,
        };
        Ok(deps.rebase(&p.root))
    }

    /// Gives every object the header prerequisites of the listing left by an
    /// earlier scan, so they hold whichever task is invoked.  A missing or
    /// stale listing is left to the `load_dependencies` task.
    pub fn preload_dependencies(&self, graph: &mut Graph, fs: &dyn FileSystem) -> crate::Result<()> {
        let p = &self.project;
        if !fs.exists(&p.dependency_file)? {
            return Ok(());
        }
        match depfile::read(fs, &p.dependency_file, &p.source_to_object()) {
            Ok(deps) => {
                let mut enhancements = Enhancements::default();
                deps.rebase(&p.root).enhance(&mut enhancements);
                graph.apply(enhancements)
            }
            Err(Error::StaleDependencyFormat { reason, .. }) => {
                debug!("not preloading {}: {}", p.dependency_file, reason);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub fn clean(&self) -> anyhow::Result<()> {
        for file in self.project.generated_files() {
            remove_if_present(&file)?;
        }
        Ok(())
    }

    fn install_path(&self) -> String {
        format!(
            "{}/{}",
            self.project.install_path,
            self.project.target_basename()
        )
    }

    pub fn install(&self) -> anyhow::Result<()> {
        let destination = self.install_path();
        install_file(&self.project.target, &destination)?;
        if self.project.target_type == TargetType::StaticLibrary {
            self.install_headers()?;
        }
        Ok(())
    }

    /// Headers found by the header search paths inside the project, each with
    /// the directory it installs under (relative to the headers install path).
    /// Headers found by a glob keep their path below the glob's fixed part.
    pub fn project_headers(&self) -> anyhow::Result<Vec<(String, String)>> {
        let p = &self.project;
        let mut headers = Vec::new();
        for search in &p.header_search_paths {
            let base = if is_glob(search) {
                glob_base(search)
            } else {
                search.as_str()
            };
            if relative_path(base, &p.root) == base {
                // Outside the project.
                continue;
            }
            for header in find_files(std::slice::from_ref(search), &p.header_extension, &p.root)? {
                let relative = if is_glob(search) {
                    let dir = Path::new(&header)
                        .parent()
                        .map(|dir| dir.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    match relative_path(&dir, base) {
                        rel if rel == "." || rel == dir => String::new(),
                        rel => rel,
                    }
                } else {
                    String::new()
                };
                headers.push((header, relative));
            }
        }
        Ok(headers)
    }

    fn install_headers(&self) -> anyhow::Result<()> {
        for (header, relative) in self.project_headers()? {
            let dir = if relative.is_empty() {
                self.project.install_headers_path.clone()
            } else {
                format!("{}/{}", self.project.install_headers_path, relative)
            };
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("permission denied to create directory '{}'", dir))?;
            let name = header.rsplit('/').next().unwrap_or(&header);
            install_file(&header, &format!("{}/{}", dir, name))?;
        }
        Ok(())
    }

    pub fn uninstall(&self) -> anyhow::Result<()> {
        let destination = self.install_path();
        if !Path::new(&destination).exists() {
            info!("the file '{}' does not exist", destination);
            return Ok(());
        }
        std::fs::remove_file(&destination).with_context(|| {
            format!(
                "you do not have permission to uninstall '{}'; try again with sudo",
                destination
            )
        })?;
        info!("removed {}", destination);
        Ok(())
    }

    /// Runs the built executable from the project directory.
    pub fn run(&self) -> anyhow::Result<()> {
        let target = &self.project.target;
        info!("{}", target);
        let status = std::process::Command::new(target)
            .current_dir(&self.project.root)
            .status()
            .with_context(|| format!("running {}", target))?;
        if !status.success() {
            return Err(anyhow!("'{}' exited with {}", target, status));
        }
        Ok(())
    }
}

fn remove_if_present(path: &str) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

fn install_file(source: &str, destination: &str) -> anyhow::Result<()> {
    if !Path::new(source).exists() {
        return Err(Error::MissingInput(source.to_string()).into());
    }
    info!("cp {} {}", source, destination);
    std::fs::copy(source, destination).with_context(|| {
        format!(
            "you do not have permission to install '{}' to '{}'",
            source, destination
        )
    })?;
    Ok(())
}
