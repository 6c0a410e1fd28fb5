//! sqlite-unsafe - run one SQL statement against a SQLite file inside a
//! locked-down process.

use std::io;

use sqlite_unsafe::cli::{program_name, Cli};
use sqlite_unsafe::error::{Result, SqliteUnsafeError};
use sqlite_unsafe::sandbox::PlatformRestrictor;
use sqlite_unsafe::{app, logging};
use tracing::debug;

fn main() {
    logging::init_stderr_logging();

    let program = program_name();
    if let Err(e) = run(&program) {
        debug!(category = e.category(), "Run failed");
        match &e {
            SqliteUnsafeError::Usage { .. } => eprintln!("{e}"),
            _ => eprintln!("{program}: {e}"),
        }
        std::process::exit(e.exit_code());
    }
}

fn run(program: &str) -> Result<()> {
    let invocation = match Cli::try_parse_invocation(std::env::args_os()) {
        Ok(invocation) => invocation,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(_) => return Err(SqliteUnsafeError::usage(program)),
    };

    let mut restrictor = PlatformRestrictor::new();
    let stdout = io::stdout().lock();
    app::run(&invocation, &mut restrictor, io::BufWriter::new(stdout))?;
    Ok(())
}
