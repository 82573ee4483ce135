//! Defines the task graph of a project.
//!
//! Run-once tasks carry a fresh timestamp every process, so no file task lists
//! one as a prerequisite; that would rebuild the file on every run.  The
//! grouping tasks `build` and `compile` put them in order instead.

use crate::builder::Builder;
use crate::fs::RealFileSystem;
use crate::graph::{Enhancements, Graph, Task};
use crate::project::{Project, TargetType};
use std::rc::Rc;

fn act(
    builder: &Rc<Builder>,
    f: impl Fn(&Builder) -> anyhow::Result<()> + 'static,
) -> impl FnMut(&mut Enhancements) -> anyhow::Result<()> {
    let builder = builder.clone();
    move |_| f(&builder)
}

/// Adds every task of `project` to `graph`, returning the builder their
/// actions share.
pub fn define(graph: &mut Graph, project: Project) -> Rc<Builder> {
    let builder = Rc::new(Builder::new(project));
    let p = builder.project();
    let name = p.target_basename().to_string();
    let scoped = |task: &str| p.scoped(task);

    graph.define(Task::once(&scoped("environment")).action(act(&builder, Builder::check_environment)));

    graph.define(
        Task::plain(&scoped("build"))
            .prerequisites([scoped("compile"), p.target.clone()])
            .description(format!("Compile and build '{}'", name)),
    );

    graph.define(Task::file(&p.project_file));
    graph.define(
        Task::file(&p.target)
            .prerequisites(&p.target_prerequisites)
            .prerequisites(p.objects())
            .description(format!("Build '{}'", name))
            .action(act(&builder, Builder::build)),
    );

    let mut compile = vec![
        scoped("environment"),
        p.objects_path.clone(),
        scoped("load_local_config"),
        p.dependency_file.clone(),
        scoped("load_dependencies"),
    ];
    compile.extend(p.objects());
    graph.define(
        Task::plain(&scoped("compile"))
            .prerequisites(compile)
            .description("Compile all sources"),
    );

    for source in &p.sources {
        graph.define(Task::file(source));
        let object = p.object_path(source);
        let src = source.clone();
        let obj = object.clone();
        graph.define(
            Task::file(&object)
                .prerequisites([source])
                .action(act(&builder, move |b| b.compile(&src, &obj))),
        );
    }
    for header in &p.headers {
        graph.define(Task::file(header));
    }

    graph.define(Task::directory(&p.objects_path));

    graph.define(Task::file(&p.local_config_file).action(act(&builder, Builder::create_local_config)));
    graph.define(
        Task::once(&scoped("load_local_config"))
            .prerequisites([&p.local_config_file])
            .action(act(&builder, Builder::load_local_config)),
    );

    graph.define(
        Task::file(&p.dependency_file)
            .prerequisites([&p.local_config_file, &p.project_file])
            .prerequisites(&p.sources)
            .prerequisites(&p.headers)
            .action(act(&builder, Builder::create_dependency_file)),
    );

    // The listing only turns into edges when something is compiled.
    let b = builder.clone();
    graph.define(
        Task::once(&scoped("load_dependencies"))
            .prerequisites([&p.dependency_file])
            .action(move |enhancements| {
                let deps = b.load_dependencies(&RealFileSystem::new())?;
                deps.enhance(enhancements);
                Ok(())
            }),
    );

    graph.define(
        Task::plain(&scoped("generated_files"))
            .description(format!(
                "List generated files (which are removed with '{}')",
                scoped("clean")
            ))
            .action(act(&builder, |b| {
                for file in b.project().generated_files() {
                    println!("{}", file);
                }
                Ok(())
            })),
    );

    graph.define(
        Task::plain(&scoped("clean"))
            .description("Remove temporary files")
            .action(act(&builder, Builder::clean)),
    );

    graph.define(
        Task::plain(&scoped("install"))
            .prerequisites([scoped("build")])
            .description(format!("Install '{}' in '{}'", name, p.install_path))
            .action(act(&builder, Builder::install)),
    );
    graph.define(
        Task::plain(&scoped("uninstall"))
            .description(format!("Uninstall '{}' from '{}'", name, p.install_path))
            .action(act(&builder, Builder::uninstall)),
    );

    if p.target_type == TargetType::Executable {
        graph.define(
            Task::plain(&scoped("run"))
                .prerequisites([scoped("build")])
                .description(format!("Run '{}'", name))
                .action(act(&builder, Builder::run)),
        );
    }

    let default = scoped(&p.default_task);
    graph.define(
        Task::plain(&p.default_alias())
            .prerequisites([&default])
            .description(format!("Equivalent to 'cbuild {}'", default)),
    );

    builder
}
