mod cli;
mod io;
mod run;

pub use cli::{Cli, Commands, InstrumentCommand, MonitorsCommand, OutputFormat, RewriteDefinitionCommand};
pub use io::{read_json_document, read_text, write_json_document};
pub use run::{execute_instrument, execute_monitors, execute_rewrite_definition, RunnerError};
