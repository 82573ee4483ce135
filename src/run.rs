use anyhow::anyhow;
use argh::FromArgs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::{
    clock::SystemClock,
    discover::expand_with_root,
    fs::RealFileSystem,
    graph::Graph,
    progress::{task_message, ConsoleProgress},
    project::{Project, DEFAULT_PROJECT_FILE},
    tasks, trace,
    work::Work,
};

#[derive(FromArgs)]
/// an incremental build helper for C, C++ and Objective-C projects
struct Args {
    /// chdir before running
    #[argh(option, short = 'C')]
    chdir: Option<String>,

    /// project file [default=cbuild.toml]
    #[argh(option, short = 'f', default = "DEFAULT_PROJECT_FILE.to_string()")]
    file: String,

    /// debugging tools, use "-d list" to list
    #[argh(option, short = 'd')]
    debug: Option<String>,

    /// print executed command lines
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// only report whether the tasks need work
    #[argh(switch, short = 'n')]
    query: bool,

    /// list tasks with descriptions
    #[argh(switch)]
    list: bool,

    /// tasks to run [default=each project's default task]
    #[argh(positional)]
    tasks: Vec<String>,
}

/// Sets up the tracing subscriber.  Debug output is on when DEBUG is set in
/// the environment or `-d log` was given; otherwise RUST_LOG decides.
fn init_logging(debug: bool, verbose: bool) {
    let filter = if debug || std::env::var_os("DEBUG").is_some() {
        EnvFilter::new("debug")
    } else if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn list_tasks(graph: &Graph) {
    let described: Vec<_> = graph
        .ids()
        .map(|id| graph.node(id))
        .filter(|node| node.description.is_some())
        .collect();
    let width = described.iter().map(|n| n.name.len()).max().unwrap_or(0);
    for node in described {
        println!(
            "cbuild {:width$}  # {}",
            node.name,
            task_message(node),
            width = width
        );
    }
}

/// Task names for files are absolute; a path given relative to the current
/// directory is looked up as such.
fn task_name(graph: &Graph, name: String) -> String {
    if graph.lookup(&name).is_some() || name.starts_with('/') {
        return name;
    }
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(_) => return name,
    };
    let path = expand_with_root(&name, &cwd.to_string_lossy());
    if graph.lookup(&path).is_some() {
        path
    } else {
        name
    }
}

fn run_impl() -> anyhow::Result<i32> {
    let args: Args = argh::from_env();

    let mut debug_log = false;
    if let Some(debug) = &args.debug {
        match debug.as_str() {
            "list" => {
                println!("debug tools:");
                println!("  log    print debug logging");
                println!("  trace  generate json performance trace");
                return Ok(1);
            }
            "log" => debug_log = true,
            "trace" => trace::open("trace.json")?,
            _ => anyhow::bail!("unknown -d {:?}, use -d list to list", debug),
        }
    }
    init_logging(debug_log, args.verbose);

    if let Some(dir) = &args.chdir {
        let dir = Path::new(dir);
        std::env::set_current_dir(dir).map_err(|err| anyhow!("chdir {:?}: {}", dir, err))?;
    }

    let projects = trace::scope("project::load", || Project::load_all(&args.file))?;
    let defaults: Vec<String> = projects.iter().map(|p| p.default_alias()).collect();
    let mut graph = Graph::new();
    let builders: Vec<_> = trace::scope("tasks::define", || {
        projects
            .into_iter()
            .map(|project| tasks::define(&mut graph, project))
            .collect()
    });

    if args.list {
        list_tasks(&graph);
        return Ok(0);
    }

    let fs = RealFileSystem::new();
    // Header dependencies from an earlier run are known before anything is
    // asked of the graph.
    trace::scope("preload", || {
        builders
            .iter()
            .try_for_each(|builder| builder.preload_dependencies(&mut graph, &fs))
    })?;

    let targets: Vec<String> = if args.tasks.is_empty() {
        defaults
    } else {
        args.tasks
            .into_iter()
            .map(|name| task_name(&graph, name))
            .collect()
    };

    let mut progress = ConsoleProgress::new(args.verbose);
    let mut work = Work::new(&mut graph, &fs, &SystemClock, &mut progress);

    if args.query {
        let mut stale = false;
        for name in &targets {
            if work.has_work(name)? {
                println!("{}: needs work", name);
                stale = true;
            } else {
                println!("{}: up to date", name);
            }
        }
        return Ok(if stale { 1 } else { 0 });
    }

    for name in &targets {
        trace::scope("work.invoke", || work.invoke(name))?;
    }

    match work.tasks_run() {
        // Special case: don't print numbers when no work done.
        0 => println!("cbuild: no work to do"),
        n => println!("cbuild: ran {} tasks, now up to date", n),
    }

    Ok(0)
}

pub fn run() -> anyhow::Result<i32> {
    let res = run_impl();
    trace::close()?;
    res
}
