//! The project file, `cbuild.toml`, and the build settings resolved from it.
//!
//! Every relative path in the project file is taken relative to the directory
//! holding it, which is also where commands run.

use crate::canon::canon_path;
use crate::discover::{
    expand_all_with_root, expand_with_root, find_files, relative_path, relative_to,
};
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PROJECT_FILE: &str = "cbuild.toml";
pub const LOCAL_CONFIG_FILE: &str = ".cbuild-local.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Executable,
    StaticLibrary,
    SharedLibrary,
}

impl TargetType {
    /// Deduces the kind of target from its file name: `.a` archives, `.so`
    /// shared objects (possibly versioned, as in `libz.so.1`), anything else
    /// an executable.
    pub fn from_target(target: &str) -> TargetType {
        let name = target.rsplit('/').next().unwrap_or(target);
        if name.ends_with(".a") {
            TargetType::StaticLibrary
        } else if name.ends_with(".so") || name.contains(".so.") {
            TargetType::SharedLibrary
        } else {
            TargetType::Executable
        }
    }

    pub fn is_library(self) -> bool {
        !matches!(self, TargetType::Executable)
    }
}

/// Toolchain defaults for a supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub name: &'static str,
    pub source_extension: &'static str,
    pub compiler: &'static str,
    pub linker: &'static str,
}

const LANGUAGES: &[Language] = &[
    Language {
        name: "c",
        source_extension: "c",
        compiler: "gcc",
        linker: "gcc",
    },
    Language {
        name: "c++",
        source_extension: "cpp",
        compiler: "g++",
        linker: "g++",
    },
    Language {
        name: "objective-c",
        source_extension: "m",
        compiler: "gcc",
        linker: "gcc",
    },
];

impl Language {
    pub fn find(name: &str) -> Option<&'static Language> {
        let name = name.to_ascii_lowercase();
        LANGUAGES.iter().find(|lang| lang.name == name)
    }
}

/// `cbuild.toml` as written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProjectFile {
    pub target: String,
    pub target_type: Option<TargetType>,
    pub language: String,

    pub compiler: Option<String>,
    pub linker: Option<String>,
    pub ar: Option<String>,
    pub ranlib: Option<String>,
    pub dependency_scanner: String,

    pub source_extension: Option<String>,
    pub header_extension: String,
    pub source_search_paths: Vec<String>,
    pub header_search_paths: Vec<String>,
    pub objects_path: String,

    pub include_paths: Vec<String>,
    pub compilation_options: Vec<String>,
    pub library_paths: Vec<String>,
    pub library_dependencies: Vec<String>,
    pub linker_options: Vec<String>,

    pub install_path: Option<String>,
    pub install_headers_path: String,

    pub task_namespace: Option<String>,
    pub default_task: String,
    pub target_prerequisites: Vec<String>,
}

impl Default for ProjectFile {
    fn default() -> Self {
        ProjectFile {
            target: "a.out".to_string(),
            target_type: None,
            language: "c++".to_string(),
            compiler: None,
            linker: None,
            ar: None,
            ranlib: None,
            dependency_scanner: "makedepend".to_string(),
            source_extension: None,
            header_extension: "h".to_string(),
            source_search_paths: vec![".".to_string()],
            header_search_paths: vec![".".to_string()],
            objects_path: ".".to_string(),
            include_paths: Vec::new(),
            compilation_options: Vec::new(),
            library_paths: Vec::new(),
            library_dependencies: Vec::new(),
            linker_options: Vec::new(),
            install_path: None,
            install_headers_path: "/usr/local/include".to_string(),
            task_namespace: None,
            default_task: "build".to_string(),
            target_prerequisites: Vec::new(),
        }
    }
}

/// A project file holding several projects as `[[project]]` tables.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectList {
    project: Vec<ProjectFile>,
}

impl ProjectFile {
    pub fn parse(text: &str, path: &str) -> Result<ProjectFile> {
        toml::from_str(text).map_err(|err| Error::Config(format!("{}: {}", path, err)))
    }

    /// Parses a file holding either one project at the top level or a list of
    /// `[[project]]` tables.
    pub fn parse_all(text: &str, path: &str) -> Result<Vec<ProjectFile>> {
        let config = |err: toml::de::Error| Error::Config(format!("{}: {}", path, err));
        let table: toml::Table = toml::from_str(text).map_err(config)?;
        if !table.contains_key("project") {
            return Ok(vec![ProjectFile::parse(text, path)?]);
        }
        let list: ProjectList = toml::Value::Table(table).try_into().map_err(config)?;
        Ok(list.project)
    }
}

/// A project with every default filled in and every path absolute.
#[derive(Debug, Clone)]
pub struct Project {
    /// The project file itself; the target depends on it.
    pub project_file: String,
    /// The directory holding the project file.
    pub root: String,

    pub target: String,
    pub target_type: TargetType,
    pub language: &'static Language,

    pub compiler: String,
    pub linker: String,
    pub ar: String,
    pub ranlib: String,
    pub dependency_scanner: String,

    pub source_extension: String,
    pub header_extension: String,
    pub header_search_paths: Vec<String>,
    pub objects_path: String,

    pub include_paths: Vec<String>,
    pub compilation_options: Vec<String>,
    pub library_paths: Vec<String>,
    pub library_dependencies: Vec<String>,
    pub linker_options: Vec<String>,

    pub install_path: String,
    pub install_headers_path: String,

    pub task_namespace: Option<String>,
    pub default_task: String,
    pub target_prerequisites: Vec<String>,

    pub local_config_file: String,
    /// The dependency listing written by the scanner.
    pub dependency_file: String,

    /// Sorted, without duplicates.
    pub sources: Vec<String>,
    /// In search order.
    pub headers: Vec<String>,
}

fn absolute(path: &str) -> Result<String> {
    if path.starts_with('/') {
        return Ok(canon_path(path));
    }
    let cwd = std::env::current_dir()?;
    Ok(expand_with_root(path, &cwd.to_string_lossy()))
}

fn read_project_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|err| Error::Config(format!("{}: {}", path, err)))
}

fn unique(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

impl Project {
    /// Reads and resolves a project file holding a single project.
    pub fn load(path: &str) -> Result<Project> {
        let project_file = absolute(path)?;
        let text = read_project_file(&project_file)?;
        let file = ProjectFile::parse(&text, &project_file)?;
        Project::resolve(file, &project_file)
    }

    /// Reads and resolves every project in a project file.  When there are
    /// several, each needs a task namespace of its own.
    pub fn load_all(path: &str) -> Result<Vec<Project>> {
        let project_file = absolute(path)?;
        let text = read_project_file(&project_file)?;
        let files = ProjectFile::parse_all(&text, &project_file)?;
        if files.is_empty() {
            return Err(Error::Config(format!("{}: no projects defined", project_file)));
        }
        let projects = files
            .into_iter()
            .map(|file| Project::resolve(file, &project_file))
            .collect::<Result<Vec<_>>>()?;
        if projects.len() > 1 {
            let mut namespaces = Vec::new();
            for project in &projects {
                match &project.task_namespace {
                    Some(ns) if !namespaces.contains(&ns) => namespaces.push(ns),
                    _ => {
                        return Err(Error::Config(format!(
                            "{}: each of several projects needs its own task_namespace",
                            project_file
                        )))
                    }
                }
            }
        }
        Ok(projects)
    }

    /// Fills in defaults, makes paths absolute and finds the project's files.
    /// `project_file` must be absolute.
    pub fn resolve(file: ProjectFile, project_file: &str) -> Result<Project> {
        let project_file = canon_path(project_file);
        let root = match Path::new(&project_file).parent() {
            Some(dir) => dir.to_string_lossy().into_owned(),
            None => {
                return Err(Error::Config(format!(
                    "{}: project file has no directory",
                    project_file
                )))
            }
        };

        let language = Language::find(&file.language).ok_or_else(|| {
            Error::Config(format!("don't know how to build '{}' programs", file.language))
        })?;
        if file.target.trim().is_empty() {
            return Err(Error::Config(
                "the target name cannot be an empty string".to_string(),
            ));
        }

        let target = expand_with_root(&file.target, &root);
        let target_type = file
            .target_type
            .unwrap_or_else(|| TargetType::from_target(&target));
        let install_path = match file.install_path {
            Some(path) => expand_with_root(&path, &root),
            None if target_type.is_library() => "/usr/local/lib".to_string(),
            None => "/usr/local/bin".to_string(),
        };
        let source_extension = file
            .source_extension
            .unwrap_or_else(|| language.source_extension.to_string());
        let objects_path = expand_with_root(&file.objects_path, &root);

        let mut target_prerequisites = file.target_prerequisites;
        target_prerequisites.push(project_file.clone());

        let source_search_paths = expand_all_with_root(&file.source_search_paths, &root);
        let header_search_paths = expand_all_with_root(&file.header_search_paths, &root);
        let mut sources = find_files(&source_search_paths, &source_extension, &root)?;
        sources.sort();
        sources.dedup();
        if sources.is_empty() {
            return Err(Error::Config(format!(
                "no source files found for '{}'",
                relative_path(&target, &root)
            )));
        }
        let headers = find_files(&header_search_paths, &file.header_extension, &root)?;

        let basename = target.rsplit('/').next().unwrap_or(&target).to_string();
        let dependency_file = format!("{}/.{}.depend.mf", objects_path, basename);

        Ok(Project {
            local_config_file: format!("{}/{}", root, LOCAL_CONFIG_FILE),
            dependency_file,
            compiler: file
                .compiler
                .unwrap_or_else(|| language.compiler.to_string()),
            linker: file.linker.unwrap_or_else(|| language.linker.to_string()),
            ar: file.ar.unwrap_or_else(|| "ar".to_string()),
            ranlib: file.ranlib.unwrap_or_else(|| "ranlib".to_string()),
            dependency_scanner: file.dependency_scanner,
            source_extension,
            header_extension: file.header_extension,
            header_search_paths,
            objects_path,
            include_paths: unique(expand_all_with_root(&file.include_paths, &root)),
            compilation_options: unique(file.compilation_options),
            library_paths: expand_all_with_root(&file.library_paths, &root),
            library_dependencies: file.library_dependencies,
            linker_options: file.linker_options,
            install_path,
            install_headers_path: expand_with_root(&file.install_headers_path, &root),
            task_namespace: file.task_namespace.filter(|ns| !ns.is_empty()),
            default_task: file.default_task,
            target_prerequisites,
            project_file,
            target,
            target_type,
            language,
            sources,
            headers,
            root,
        })
    }

    pub fn target_basename(&self) -> &str {
        self.target.rsplit('/').next().unwrap_or(&self.target)
    }

    /// The name of `source` with its extension swapped for `.o`.
    fn object_name(&self, source: &str) -> String {
        let suffix = format!(".{}", self.source_extension);
        let stem = source.strip_suffix(&suffix).unwrap_or(source);
        format!("{}.o", stem)
    }

    /// Where the object for `source` goes: the objects directory plus the
    /// source's basename.
    pub fn object_path(&self, source: &str) -> String {
        let basename = source.rsplit('/').next().unwrap_or(source);
        format!("{}/{}", self.objects_path, self.object_name(basename))
    }

    pub fn objects(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|source| self.object_path(source))
            .collect()
    }

    /// Each source as the dependency scanner is given it: relative to the
    /// project root, with `..` for sources outside it.
    pub fn scanner_source(&self, source: &str) -> String {
        relative_to(source, &self.root)
    }

    /// Maps the object path the dependency scanner names for each source
    /// (the source as given to the scanner, with a `.o` extension) to the
    /// object's real path.
    pub fn source_to_object(&self) -> FxHashMap<String, String> {
        self.sources
            .iter()
            .map(|source| {
                let assumed = self.object_name(&self.scanner_source(source));
                (assumed, self.object_path(source))
            })
            .collect()
    }

    /// The task name `task` takes in this project's namespace.
    pub fn scoped(&self, task: &str) -> String {
        match &self.task_namespace {
            Some(ns) => format!("{}:{}", ns, task),
            None => task.to_string(),
        }
    }

    /// The name of the task aliasing the default task.
    pub fn default_alias(&self) -> String {
        match &self.task_namespace {
            Some(ns) => ns.clone(),
            None => "default".to_string(),
        }
    }

    /// Everything the build writes, which `clean` removes.
    pub fn generated_files(&self) -> Vec<String> {
        let mut files = self.objects();
        files.push(self.target.clone());
        files.push(self.dependency_file.clone());
        files
    }
}
