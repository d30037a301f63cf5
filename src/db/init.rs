use std::path::PathBuf;

use clap::Parser;
use strum::IntoEnumIterator as _;

use crate::model::Vocabulary;
use crate::store::Store;

/// Command line arguments for `db init` sub command.
#[derive(Parser, Debug)]
#[command(about = "Create the entity store and seed vocabularies", long_about = None)]
pub struct Args {
    /// Path to the RocksDB directory; created if missing.
    #[arg(long)]
    pub path_db: PathBuf,
}

pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Initializing store at {}", args.path_db.display());
    let store = Store::open_and_init(&args.path_db)?;
    for vocabulary in Vocabulary::iter() {
        tracing::info!(
            "  {} vocabulary has {} terms",
            vocabulary,
            store.terms(vocabulary)?.len()
        );
    }
    store.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use temp_testdir::TempDir;

    use super::{run, Args};
    use crate::model::Vocabulary;
    use crate::store::Store;

    #[tracing_test::traced_test]
    #[test]
    fn init_seeds_once() -> Result<(), anyhow::Error> {
        let temp = TempDir::default();
        let args = Args {
            path_db: temp.join("db"),
        };
        run(&Default::default(), &args)?;
        run(&Default::default(), &args)?;

        let store = Store::open(&args.path_db)?;
        assert_eq!(store.terms(Vocabulary::Status)?.len(), 4);
        assert_eq!(store.code_for(Vocabulary::Label, "Fragment")?, Some(3));
        assert!(logs_contain("entry_type vocabulary has 4 terms"));
        assert!(logs_contain("status vocabulary has 4 terms"));
        assert!(logs_contain("label vocabulary has 4 terms"));
        Ok(())
    }
}
