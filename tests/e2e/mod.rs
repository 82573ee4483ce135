//! Support code for e2e tests, which run cbuild as a binary.
//!
//! The compiler, linker and dependency scanner are small shell scripts
//! written into each test space, so no C toolchain is needed.

mod basic;
mod deps;
mod install;
mod layout;

use std::time::{Duration, SystemTime};

pub fn cbuild_command(args: Vec<&str>) -> std::process::Command {
    let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_cbuild"));
    cmd.args(args);
    cmd.env_remove("DEBUG");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn print_output(out: &std::process::Output) {
    // Gross: use print! instead of writing to stdout so Rust test
    // framework can capture it.
    print!("{}", std::str::from_utf8(&out.stdout).unwrap());
    print!("{}", std::str::from_utf8(&out.stderr).unwrap());
}

pub fn assert_output_contains(out: &std::process::Output, text: &str) {
    let out = std::str::from_utf8(&out.stdout).unwrap();
    if !out.contains(text) {
        panic!(
            "assertion failed; expected output to contain {:?} but got:\n{}",
            text, out
        );
    }
}

pub fn assert_output_not_contains(out: &std::process::Output, text: &str) {
    let out = std::str::from_utf8(&out.stdout).unwrap();
    if out.contains(text) {
        panic!(
            "assertion failed; expected output to not contain {:?} but got:\n{}",
            text, out
        );
    }
}

/// Stands in for both compiler and linker: writes whatever follows `-o` as a
/// runnable script, and appends its name to calls.log.  Asked for `-v`, it
/// reports an include search list instead.
pub const FAKE_CC: &str = r#"#!/bin/sh
if [ "$1" = "-v" ]; then
  echo '#include <...> search starts here:' >&2
  echo ' /fake/include' >&2
  echo 'End of search list.' >&2
  exit 0
fi
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
printf '#!/bin/sh\necho hello from %s\n' "$out" > "$out"
chmod +x "$out"
echo "$out" >> calls.log
"#;

/// Stands in for makedepend.
pub const FAKE_SCANNER: &str = r##"#!/bin/sh
echo "# DO NOT DELETE"
echo ""
echo "src/a.o: include/a.h include/common.h"
echo "src/b.o: include/common.h"
"##;

/// Stands in for makedepend, naming each source it is given as the sole
/// dependency of that source's object.
pub const PER_SOURCE_SCANNER: &str = r#"#!/bin/sh
while [ $# -gt 0 ] && [ "$1" != "--" ]; do shift; done; shift
while [ $# -gt 0 ] && [ "$1" != "--" ]; do shift; done; shift
for src in "$@"; do echo "${src%.c}.o: $src"; done
"#;

pub const PROJECT: &str = r#"
target = "app"
language = "c"
compiler = "sh fakecc.sh"
linker = "sh fakecc.sh"
dependency_scanner = "sh fakescan.sh"
source_search_paths = ["src"]
header_search_paths = ["include"]
include_paths = ["include"]
objects_path = "objs"
"#;

/// Manages a temporary directory for invoking cbuild.
pub struct TestSpace {
    dir: tempfile::TempDir,
}
impl TestSpace {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(TestSpace { dir })
    }

    /// A space holding a two-source C project and the fake tools.
    pub fn with_project(project: &str) -> anyhow::Result<Self> {
        let space = TestSpace::new()?;
        space.write_project("", project)?;
        Ok(space)
    }

    /// Writes the two-source project and the fake tools into `dir`.
    pub fn write_project(&self, dir: &str, project: &str) -> std::io::Result<()> {
        let within = |path: &str| match dir {
            "" => path.to_string(),
            dir => format!("{}/{}", dir, path),
        };
        self.write(&within("fakecc.sh"), FAKE_CC)?;
        self.write(&within("fakescan.sh"), FAKE_SCANNER)?;
        self.write(&within("cbuild.toml"), project)?;
        self.write(&within("src/a.c"), "#include \"a.h\"\n")?;
        self.write(&within("src/b.c"), "#include \"common.h\"\n")?;
        self.write(&within("include/a.h"), "")?;
        self.write(&within("include/common.h"), "")
    }

    pub fn path(&self, path: &str) -> std::path::PathBuf {
        self.dir.path().join(path)
    }

    /// Write a file into the working space, creating directories as needed.
    pub fn write(&self, path: &str, content: &str) -> std::io::Result<()> {
        let path = self.path(path);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, content)
    }

    /// Read a file from the working space.
    pub fn read(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.path(path))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.path(path).exists()
    }

    /// Sets a file's mtime to `secs` seconds in the past.
    pub fn age(&self, path: &str, secs: u64) -> std::io::Result<()> {
        let time = SystemTime::now() - Duration::from_secs(secs);
        filetime::set_file_mtime(self.path(path), filetime::FileTime::from_system_time(time))
    }

    /// Ages every file of a finished build so later edits are clearly newer,
    /// keeping each output newer than its inputs.
    pub fn settle(&self) -> std::io::Result<()> {
        for input in [
            "cbuild.toml",
            "src/a.c",
            "src/b.c",
            "include/a.h",
            "include/common.h",
        ] {
            self.age(input, 100)?;
        }
        self.age(".cbuild-local.toml", 90)?;
        self.age("objs/.app.depend.mf", 80)?;
        self.age("objs/a.o", 70)?;
        self.age("objs/b.o", 70)?;
        self.age("app", 60)
    }

    /// Names the fake tools were asked to produce since the last call.
    pub fn take_calls(&self) -> anyhow::Result<Vec<String>> {
        self.take_calls_from("calls.log")
    }

    /// Like take_calls, for tools that ran in some other directory.  Names
    /// stay relative to the space.
    pub fn take_calls_from(&self, log: &str) -> anyhow::Result<Vec<String>> {
        let text = self.read(log).unwrap_or_default();
        self.write(log, "")?;
        let root = self.dir.path().to_str().unwrap();
        Ok(text
            .lines()
            .map(|line| line.strip_prefix(root).unwrap_or(line))
            .map(|line| line.trim_start_matches('/').to_string())
            .collect())
    }

    /// Invoke cbuild, returning process output.
    pub fn run(&self, cmd: &mut std::process::Command) -> std::io::Result<std::process::Output> {
        cmd.current_dir(self.dir.path()).output()
    }

    /// Like run, but also print output if the build failed.
    pub fn run_expect(
        &self,
        cmd: &mut std::process::Command,
    ) -> anyhow::Result<std::process::Output> {
        let out = self.run(cmd)?;
        if !out.status.success() {
            print_output(&out);
            anyhow::bail!("build failed, status {}", out.status);
        }
        Ok(out)
    }

    /// Persist the temp dir locally and abort the test.  Debugging helper.
    #[allow(dead_code)]
    pub fn eject(self) -> ! {
        panic!("ejected at {:?}", self.dir.into_path());
    }
}
