//! Makefile-style dependency listings, as written by makedepend or `cc -M`,
//! and loading them into the graph as header prerequisites.
//!
//! The scanner names each object as if it were compiled next to its source,
//! so listing targets are re-keyed through a map from that assumed path to
//! the object's real path before any edges are added.

use crate::canon::canon_path;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::graph::{Enhancements, Graph};
use crate::scanner::{ParseResult, Scanner};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct Deps<'a> {
    pub target: &'a str,
    pub deps: Vec<&'a str>,
}

/// Skip spaces, tabs and backslashed newlines.
fn skip_spaces(scanner: &mut Scanner) -> ParseResult<()> {
    loop {
        match scanner.read() {
            ' ' | '\t' => {}
            '\\' => match scanner.read() {
                '\n' => {}
                '\r' => scanner.expect('\n')?,
                _ => {
                    scanner.back();
                    return scanner.parse_error("invalid backslash escape");
                }
            },
            _ => {
                scanner.back();
                break;
            }
        }
    }
    Ok(())
}

/// Reads one path.  A backslashed space belongs to the path and is left
/// escaped; a colon ends a rule's target but may appear in its dependencies.
fn read_path<'a>(scanner: &mut Scanner<'a>, target: bool) -> ParseResult<Option<&'a str>> {
    skip_spaces(scanner)?;
    let start = scanner.ofs;
    loop {
        match scanner.read() {
            '\\' => match scanner.peek() {
                ' ' => scanner.next(),
                '\n' | '\r' => {
                    scanner.back();
                    break;
                }
                _ => {}
            },
            ':' if !target => {}
            '\0' | ' ' | '\t' | ':' | '\n' | '\r' => {
                scanner.back();
                break;
            }
            _ => {}
        }
    }
    let end = scanner.ofs;
    if end == start {
        return Ok(None);
    }
    Ok(Some(scanner.slice(start, end)))
}

/// Parses a whole listing.  Blank lines, `#` comments, and lines that are not
/// of the form `target: deps...` are skipped.
pub fn parse<'a>(scanner: &mut Scanner<'a>) -> ParseResult<Vec<Deps<'a>>> {
    let mut listing = Vec::new();
    loop {
        skip_spaces(scanner)?;
        match scanner.peek() {
            '\0' => break,
            '\n' | '\r' => {
                scanner.next();
                continue;
            }
            '#' => {
                scanner.skip_line();
                continue;
            }
            _ => {}
        }

        let target = read_path(scanner, true)?;
        let target = match target {
            Some(target) if scanner.skip(':') => target,
            _ => {
                scanner.skip_line();
                continue;
            }
        };
        // "a.o:b.h" is not a rule line; the separator is a colon then whitespace.
        match scanner.peek() {
            ' ' | '\t' | '\n' | '\r' | '\0' => {}
            _ => {
                scanner.skip_line();
                continue;
            }
        }

        let mut deps = Vec::new();
        while let Some(path) = read_path(scanner, false)? {
            deps.push(path);
        }
        scanner.skip('\r');
        if !scanner.skip('\n') && !scanner.at_end() {
            return scanner.parse_error(format!("unexpected {:?}", scanner.peek()));
        }
        listing.push(Deps { target, deps });
    }
    Ok(listing)
}

fn unescape(path: &str) -> String {
    path.replace("\\ ", " ")
}

/// Header dependencies per object file, keyed by the object's real path.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ObjectDeps {
    map: BTreeMap<String, Vec<String>>,
}

impl ObjectDeps {
    /// Re-keys a parsed listing through `source_to_object`, which maps the
    /// object path the scanner assumes to the real object path.
    ///
    /// An absolute target is the mark of a listing written by an older
    /// scheme, and a target missing from the map means the listing was made
    /// for a different set of sources; either way the listing is stale and
    /// nothing is mapped.
    pub fn from_listing(
        path: &str,
        listing: &[Deps],
        source_to_object: &FxHashMap<String, String>,
    ) -> Result<ObjectDeps> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in listing {
            if entry.target.starts_with('/') {
                return Err(Error::StaleDependencyFormat {
                    path: path.to_string(),
                    reason: format!("'{}' is an absolute object path", entry.target),
                });
            }
            let target = unescape(entry.target);
            let object = source_to_object
                .get(&target)
                .or_else(|| source_to_object.get(&canon_path(target.as_str())))
                .ok_or_else(|| Error::StaleDependencyFormat {
                    path: path.to_string(),
                    reason: format!("no source file produces '{}'", entry.target),
                })?;
            let headers = map.entry(object.clone()).or_default();
            for dep in &entry.deps {
                let dep = canon_path(unescape(dep));
                if !headers.contains(&dep) {
                    headers.push(dep);
                }
            }
        }
        Ok(ObjectDeps { map })
    }

    /// Expands relative header paths against `root`, the directory the
    /// scanner ran in.
    pub fn rebase(self, root: &str) -> ObjectDeps {
        let map = self
            .map
            .into_iter()
            .map(|(object, headers)| {
                let headers = headers
                    .into_iter()
                    .map(|header| crate::discover::expand_with_root(&header, root))
                    .collect();
                (object, headers)
            })
            .collect();
        ObjectDeps { map }
    }

    pub fn get(&self, object: &str) -> Option<&[String]> {
        self.map.get(object).map(|headers| headers.as_slice())
    }

    /// Records the header edges: a file task per header, and the headers
    /// appended to each object's prerequisites.
    pub fn enhance(&self, enhancements: &mut Enhancements) {
        for (object, headers) in &self.map {
            for header in headers {
                enhancements.file(header);
            }
            enhancements.enhance(object, headers);
        }
    }
}

/// Stands in for a file name when the listing didn't come from a file.
const INLINE: &str = "<listing>";

/// Parses listing text and re-keys it, see `ObjectDeps::from_listing`.
pub fn object_deps(
    text: &str,
    source_to_object: &FxHashMap<String, String>,
) -> Result<ObjectDeps> {
    let mut scanner = Scanner::new(text);
    let listing = parse(&mut scanner)
        .map_err(|err| Error::Parse(scanner.format_parse_error(INLINE, err)))?;
    ObjectDeps::from_listing(INLINE, &listing, source_to_object)
}

/// Reads a listing file from disk.  A listing that doesn't parse is stale
/// like any other the current sources can't use.
pub fn read(
    fs: &dyn FileSystem,
    path: &str,
    source_to_object: &FxHashMap<String, String>,
) -> Result<ObjectDeps> {
    let bytes = fs.read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let mut scanner = Scanner::new(&text);
    let listing = parse(&mut scanner).map_err(|err| Error::StaleDependencyFormat {
        path: path.to_string(),
        reason: scanner.format_parse_error(path, err),
    })?;
    ObjectDeps::from_listing(path, &listing, source_to_object)
}

/// Loads listing text straight into the graph: every object named in it
/// gains its headers as prerequisites.
pub fn load(
    graph: &mut Graph,
    text: &str,
    source_to_object: &FxHashMap<String, String>,
) -> Result<ObjectDeps> {
    let deps = object_deps(text, source_to_object)?;
    let mut enhancements = Enhancements::default();
    deps.enhance(&mut enhancements);
    graph.apply(enhancements)?;
    Ok(deps)
}
