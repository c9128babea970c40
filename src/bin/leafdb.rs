use eyre::{Result, WrapErr};

use leafdb::cli::Repl;
use leafdb::Database;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "leafdb".to_owned());
    let db = Database::open(&path)
        .wrap_err_with(|| format!("failed to open database at '{path}'"))?;

    let mut repl = Repl::new(db)?;
    repl.run()
}
