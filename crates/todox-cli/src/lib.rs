//! Library components of the `todox` command-line tool.

pub mod logging;
pub mod push;
pub mod settings;
pub mod summary;
