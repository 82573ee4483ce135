//! Path canonicalization.

/// Lexically canonicalize a path, removing redundant components.
/// Does not access the disk, but only simplifies things like
/// "foo/./bar" => "foo/bar".
/// Task names that are paths go through this so that "objs/./a.o" and
/// "objs/a.o" name the same node.
pub fn canon_path<T: Into<String>>(inpath: T) -> String {
    let path: String = inpath.into();
    if path.is_empty() {
        return path;
    }
    let absolute = path.starts_with('/');

    let mut components: Vec<&str> = Vec::new();
    // Number of leading ".." components, which can't be backed out of.
    let mut parents = 0;
    let mut last = "";
    for component in path.split('/') {
        last = component;
        match component {
            "" | "." => {}
            ".." => {
                if components.len() > parents {
                    components.pop();
                } else if !absolute {
                    components.push("..");
                    parents += 1;
                }
            }
            _ => components.push(component),
        }
    }

    let mut out = String::with_capacity(path.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&components.join("/"));
    // "foo/" and "foo/." keep their trailing slash.
    if (last.is_empty() || last == ".") && !components.is_empty() {
        out.push('/');
    }
    out
}
