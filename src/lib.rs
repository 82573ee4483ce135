pub mod builder;
pub mod canon;
pub mod clock;
pub mod depfile;
pub mod discover;
pub mod error;
pub mod fs;
pub mod graph;
pub mod local_config;
pub mod progress;
pub mod project;
pub mod run;
pub mod scanner;
pub mod stamp;
pub mod tasks;
pub mod toolchain;
pub mod trace;
pub mod work;

pub use error::{Error, Result};
pub use graph::{Enhancements, Graph, Task, TaskId};
pub use work::Work;
