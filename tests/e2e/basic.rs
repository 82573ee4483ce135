use crate::e2e::*;

#[test]
fn build_from_scratch() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    let out = space.run_expect(&mut cbuild_command(vec![]))?;
    assert_output_contains(&out, "cbuild: ran ");
    assert_eq!(space.take_calls()?, vec!["objs/a.o", "objs/b.o", "app"]);

    assert!(space.exists("app"));
    assert!(space.exists(".cbuild-local.toml"));
    let listing = space.read("objs/.app.depend.mf")?;
    assert!(listing.contains("src/a.o: include/a.h include/common.h"));
    Ok(())
}

#[test]
fn no_work_to_do() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.run_expect(&mut cbuild_command(vec!["build"]))?;
    space.take_calls()?;

    let out = space.run_expect(&mut cbuild_command(vec!["build"]))?;
    assert_eq!(std::str::from_utf8(&out.stdout)?, "cbuild: no work to do\n");
    assert!(space.take_calls()?.is_empty());
    Ok(())
}

#[test]
fn header_touch_recompiles_includers() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    space.settle()?;
    space.take_calls()?;

    space.age("include/a.h", 50)?;
    let out = space.run_expect(&mut cbuild_command(vec![]))?;
    assert_output_contains(&out, "cbuild: ran ");
    assert_eq!(space.take_calls()?, vec!["objs/a.o", "app"]);

    space.settle()?;
    space.age("include/common.h", 50)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    assert_eq!(space.take_calls()?, vec!["objs/a.o", "objs/b.o", "app"]);
    Ok(())
}

#[test]
fn source_touch_recompiles_one_object() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    space.settle()?;
    space.take_calls()?;

    space.age("src/b.c", 50)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    assert_eq!(space.take_calls()?, vec!["objs/b.o", "app"]);
    Ok(())
}

#[test]
fn missing_object_is_rebuilt() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    space.settle()?;
    space.take_calls()?;

    std::fs::remove_file(space.path("objs/a.o"))?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    assert_eq!(space.take_calls()?, vec!["objs/a.o", "app"]);
    Ok(())
}

#[test]
fn query_reports_staleness() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    space.settle()?;
    space.take_calls()?;

    let out = space.run_expect(&mut cbuild_command(vec!["-n", "app"]))?;
    assert_output_contains(&out, "/app: up to date");

    space.age("src/a.c", 50)?;
    let out = space.run(&mut cbuild_command(vec!["-n", "app"]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "/app: needs work");
    // Querying ran nothing.
    assert!(space.take_calls()?.is_empty());
    Ok(())
}

#[test]
fn query_sees_header_changes() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    space.settle()?;

    // Setup tasks still to run once don't count as work.
    let out = space.run_expect(&mut cbuild_command(vec!["-n", "build"]))?;
    assert_output_contains(&out, "build: up to date");

    space.age("include/a.h", 50)?;
    let out = space.run(&mut cbuild_command(vec!["-n", "app"]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "/app: needs work");
    let out = space.run(&mut cbuild_command(vec!["-n", "build"]))?;
    assert_output_contains(&out, "build: needs work");
    Ok(())
}

#[test]
fn list_tasks() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    let out = space.run_expect(&mut cbuild_command(vec!["--list"]))?;
    assert_output_contains(&out, "cbuild build");
    assert_output_contains(&out, "# Compile and build 'app'");
    assert_output_contains(&out, "# Remove temporary files");
    assert_output_contains(&out, "# Equivalent to 'cbuild build'");
    assert_output_not_contains(&out, "load_dependencies");
    Ok(())
}

#[test]
fn unknown_task() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    let out = space.run(&mut cbuild_command(vec!["nope"]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "cbuild: error: don't know how to build task 'nope'");
    Ok(())
}

#[test]
fn missing_tool() -> anyhow::Result<()> {
    let project = PROJECT.replace("sh fakecc.sh", "no-such-cc-anywhere");
    let space = TestSpace::with_project(&project)?;
    let out = space.run(&mut cbuild_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "required tool 'no-such-cc-anywhere' not found");
    assert!(!space.exists("app"));
    Ok(())
}

#[test]
fn clean_removes_outputs() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    assert!(space.exists("objs/a.o"));

    space.run_expect(&mut cbuild_command(vec!["clean"]))?;
    for generated in ["app", "objs/a.o", "objs/b.o", "objs/.app.depend.mf"] {
        assert!(!space.exists(generated), "{} survived clean", generated);
    }
    assert!(space.exists("src/a.c"));
    Ok(())
}

#[test]
fn run_executable() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    let out = space.run_expect(&mut cbuild_command(vec!["run"]))?;
    assert_output_contains(&out, "hello from ");
    Ok(())
}

#[test]
fn namespaced_project() -> anyhow::Result<()> {
    let project = format!("{}task_namespace = \"demo\"\n", PROJECT);
    let space = TestSpace::with_project(&project)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    assert!(space.exists("app"));

    let out = space.run(&mut cbuild_command(vec!["build"]))?;
    assert!(!out.status.success());

    space.run_expect(&mut cbuild_command(vec!["demo:clean"]))?;
    assert!(!space.exists("app"));
    Ok(())
}
