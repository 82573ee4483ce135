use crate::e2e::*;

#[test]
fn sources_outside_the_project_directory() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("proj/fakecc.sh", FAKE_CC)?;
    space.write("proj/fakescan.sh", PER_SOURCE_SCANNER)?;
    space.write(
        "proj/cbuild.toml",
        r#"
target = "app"
language = "c"
compiler = "sh fakecc.sh"
linker = "sh fakecc.sh"
dependency_scanner = "sh fakescan.sh"
source_search_paths = ["src", "../shared"]
header_search_paths = []
objects_path = "objs"
"#,
    )?;
    space.write("proj/src/main.c", "")?;
    space.write("shared/x.c", "")?;

    space.run_expect(&mut cbuild_command(vec!["-C", "proj"]))?;
    let listing = space.read("proj/objs/.app.depend.mf")?;
    assert!(listing.contains("../shared/x.o: ../shared/x.c"), "{}", listing);
    assert_eq!(
        space.take_calls_from("proj/calls.log")?,
        vec!["proj/objs/main.o", "proj/objs/x.o", "proj/app"]
    );

    let out = space.run_expect(&mut cbuild_command(vec!["-C", "proj"]))?;
    assert_output_contains(&out, "cbuild: no work to do");
    Ok(())
}

#[test]
fn project_directory_with_spaces() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write_project("my project", PROJECT)?;

    space.run_expect(&mut cbuild_command(vec!["-C", "my project"]))?;
    assert_eq!(
        space.take_calls_from("my project/calls.log")?,
        vec!["my project/objs/a.o", "my project/objs/b.o", "my project/app"]
    );

    let out = space.run_expect(&mut cbuild_command(vec!["-C", "my project", "run"]))?;
    assert_output_contains(&out, "hello from ");
    assert!(space.take_calls_from("my project/calls.log")?.is_empty());
    Ok(())
}

const TWO_PROJECTS: &str = r#"
[[project]]
target = "first"
language = "c"
compiler = "sh fakecc.sh"
linker = "sh fakecc.sh"
dependency_scanner = "sh fakescan.sh"
source_search_paths = ["src/a.c"]
header_search_paths = ["include"]
include_paths = ["include"]
objects_path = "objs"
task_namespace = "first"

[[project]]
target = "second"
language = "c"
compiler = "sh fakecc.sh"
linker = "sh fakecc.sh"
dependency_scanner = "sh fakescan.sh"
source_search_paths = ["src/b.c"]
header_search_paths = ["include"]
include_paths = ["include"]
objects_path = "objs"
task_namespace = "second"
"#;

#[test]
fn several_projects_in_one_file() -> anyhow::Result<()> {
    let space = TestSpace::with_project(TWO_PROJECTS)?;
    space.write("fakescan.sh", PER_SOURCE_SCANNER)?;

    // With no tasks named, every project builds.
    space.run_expect(&mut cbuild_command(vec![]))?;
    assert_eq!(
        space.take_calls()?,
        vec!["objs/a.o", "first", "objs/b.o", "second"]
    );
    assert!(space.read("objs/.first.depend.mf")?.contains("src/a.o: src/a.c"));
    assert!(space.read("objs/.second.depend.mf")?.contains("src/b.o: src/b.c"));

    let out = space.run_expect(&mut cbuild_command(vec![]))?;
    assert_output_contains(&out, "cbuild: no work to do");

    space.run_expect(&mut cbuild_command(vec!["second:clean"]))?;
    assert!(!space.exists("second"));
    assert!(space.exists("first"));

    space.run_expect(&mut cbuild_command(vec!["second"]))?;
    assert_eq!(space.take_calls()?, vec!["objs/b.o", "second"]);
    Ok(())
}

#[test]
fn several_projects_need_namespaces() -> anyhow::Result<()> {
    let project = TWO_PROJECTS.replace("task_namespace = \"second\"\n", "");
    let space = TestSpace::with_project(&project)?;
    let out = space.run(&mut cbuild_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "needs its own task_namespace");
    Ok(())
}
