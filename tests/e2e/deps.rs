use crate::e2e::*;

#[test]
fn legacy_listing_is_regenerated() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    let root = space.path("");
    let root = root.to_str().unwrap().trim_end_matches('/');

    // Listings once named objects by absolute path.
    space.write(
        "objs/.app.depend.mf",
        &format!("{}/src/a.o: include/a.h\n", root),
    )?;
    space.settle()?;
    space.take_calls()?;

    space.run_expect(&mut cbuild_command(vec![]))?;
    let listing = space.read("objs/.app.depend.mf")?;
    assert!(!listing.contains(root));
    assert!(listing.contains("src/b.o: include/common.h"));
    assert!(space.take_calls()?.is_empty());

    // A listing for some other set of sources is stale too.
    space.write("objs/.app.depend.mf", "src/gone.o: include/a.h\n")?;
    space.settle()?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    assert!(space.read("objs/.app.depend.mf")?.contains("src/a.o:"));
    Ok(())
}

#[test]
fn regenerated_listing_still_tracks_headers() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    space.write("objs/.app.depend.mf", "/elsewhere/src/a.o: include/a.h\n")?;
    space.settle()?;
    space.take_calls()?;

    space.age("include/a.h", 50)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    assert_eq!(space.take_calls()?, vec!["objs/a.o", "app"]);
    Ok(())
}

#[test]
fn missing_headers_are_reported() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.write(
        "fakescan.sh",
        r#"#!/bin/sh
echo 'makedepend: warning:  src/a.c (reading include/a.h, line 1): cannot find include file "nothere.h"' >&2
echo "src/a.o: include/a.h"
"#,
    )?;
    let out = space.run(&mut cbuild_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "the following header files are missing:\nnothere.h");
    assert!(!space.exists("objs/.app.depend.mf"));
    assert!(!space.exists("app"));
    Ok(())
}

#[test]
fn scanner_failure_stops_the_build() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.write("fakescan.sh", "#!/bin/sh\necho 'scanner broke' >&2\nexit 2\n")?;
    let out = space.run(&mut cbuild_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "exit 2");
    assert_output_contains(&out, "scanner broke");
    assert!(space.take_calls()?.is_empty());
    Ok(())
}

#[test]
fn target_task_sees_header_changes() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    space.settle()?;
    space.take_calls()?;

    // Naming the target skips the compile task, so the edges come from the
    // listing left by the first run.
    space.age("include/a.h", 50)?;
    space.run_expect(&mut cbuild_command(vec!["app"]))?;
    assert_eq!(space.take_calls()?, vec!["objs/a.o", "app"]);
    Ok(())
}

#[test]
fn scanner_is_given_compiler_include_paths() -> anyhow::Result<()> {
    let space = TestSpace::with_project(PROJECT)?;
    space.write(
        "fakescan.sh",
        &format!("{}echo \"$@\" > scan.args\n", FAKE_SCANNER),
    )?;
    space.run_expect(&mut cbuild_command(vec![]))?;
    let args = space.read("scan.args")?;
    assert!(args.contains("-Iinclude -I/fake/include -- "), "{}", args);
    // Compiling needs no help finding the compiler's own headers.
    assert!(!space.read(".cbuild-local.toml")?.contains("/fake/include"));
    Ok(())
}
