//! Chrome trace output.
//!
//! When enabled with `-d trace`, every executed task becomes a "complete"
//! event in trace.json, viewable in chrome://tracing or Perfetto.

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

thread_local! {
    static TRACE: RefCell<Option<Trace>> = const { RefCell::new(None) };
}

struct Trace {
    start: Instant,
    w: BufWriter<File>,
}

impl Trace {
    fn new(path: &str) -> std::io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "[")?;
        Ok(Trace {
            start: Instant::now(),
            w,
        })
    }

    fn write_complete(&mut self, name: &str, start: Instant, end: Instant) -> std::io::Result<()> {
        write!(
            self.w,
            "{{ \"pid\": 0, \"name\": {:?}, \"ts\": {}, \"ph\": \"X\", \"dur\": {} }}",
            name,
            start.duration_since(self.start).as_micros(),
            end.duration_since(start).as_micros()
        )
    }

    fn close(&mut self) -> std::io::Result<()> {
        let start = self.start;
        self.write_complete("main", start, Instant::now())?;
        writeln!(self.w, "\n]")?;
        self.w.flush()
    }
}

pub fn open(path: &str) -> std::io::Result<()> {
    let trace = Trace::new(path)?;
    TRACE.with(|t| *t.borrow_mut() = Some(trace));
    Ok(())
}

/// Runs `f`, recording it as an event named `name` if tracing is on.
#[inline]
pub fn scope<T>(name: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    TRACE.with(|t| {
        if let Some(trace) = t.borrow_mut().as_mut() {
            // A failed trace write shouldn't fail the build.
            let _ = trace
                .write_complete(name, start, Instant::now())
                .and_then(|_| writeln!(trace.w, ","));
        }
    });
    result
}

pub fn close() -> std::io::Result<()> {
    TRACE.with(|t| match t.borrow_mut().take() {
        Some(mut trace) => trace.close(),
        None => Ok(()),
    })
}
