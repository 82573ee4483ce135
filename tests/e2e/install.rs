use crate::e2e::*;

#[test]
fn install_and_uninstall_executable() -> anyhow::Result<()> {
    let project = format!("{}install_path = \"dest/bin\"\n", PROJECT);
    let space = TestSpace::with_project(&project)?;
    std::fs::create_dir_all(space.path("dest/bin"))?;

    space.run_expect(&mut cbuild_command(vec!["install"]))?;
    assert!(space.exists("app"));
    assert!(space.exists("dest/bin/app"));

    space.run_expect(&mut cbuild_command(vec!["uninstall"]))?;
    assert!(!space.exists("dest/bin/app"));
    // Nothing left to remove is not an error.
    space.run_expect(&mut cbuild_command(vec!["uninstall"]))?;
    Ok(())
}

#[test]
fn install_static_library_with_headers() -> anyhow::Result<()> {
    let project = r#"
target = "libdemo.a"
language = "c"
compiler = "sh fakecc.sh"
ar = "sh fakear.sh"
ranlib = "true"
dependency_scanner = "sh fakescan.sh"
source_search_paths = ["src"]
header_search_paths = ["include"]
include_paths = ["include"]
objects_path = "objs"
install_path = "dest/lib"
install_headers_path = "dest/include"
"#;
    let space = TestSpace::with_project(project)?;
    // ar -cq <archive> <objects...>
    space.write("fakear.sh", "#!/bin/sh\necho archive > \"$2\"\n")?;
    std::fs::create_dir_all(space.path("dest/lib"))?;

    let out = space.run_expect(&mut cbuild_command(vec!["--list"]))?;
    assert_output_not_contains(&out, "cbuild run ");

    space.run_expect(&mut cbuild_command(vec!["install"]))?;
    assert_eq!(space.read("dest/lib/libdemo.a")?, "archive\n");
    assert!(space.exists("dest/include/a.h"));
    assert!(space.exists("dest/include/common.h"));
    Ok(())
}
