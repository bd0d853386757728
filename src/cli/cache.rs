//! Cache command implementations (show, clear)

use std::path::Path;
use std::process::ExitCode;

use super::{load_pipeline_config, CacheAction, EXIT_ERROR, EXIT_SUCCESS};
use crate::pipeline::CacheIndex;

/// Run the cache command
pub fn run_cache(config_path: Option<&Path>, action: CacheAction) -> ExitCode {
    let config = match load_pipeline_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let mut index = CacheIndex::load(&config.cache.dir);

    match action {
        CacheAction::Show => {
            let fingerprint = config.fingerprint();
            println!("Cache index: {}", index.path().display());
            println!("Current fingerprint: {}", fingerprint);
            println!("Entries: {}", index.len());
            for (key, entry) in index.entries() {
                let marker = if entry.config_hash == fingerprint { "*" } else { " " };
                let status = if entry.result.success { "ok" } else { "failed" };
                println!(
                    " {} {} [{}] {:.2}s at {:.0}",
                    marker,
                    key,
                    status,
                    entry.result.duration.as_secs_f64(),
                    entry.timestamp
                );
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        CacheAction::Clear => {
            let removed = index.len();
            index.clear();
            if let Err(e) = index.save() {
                eprintln!("Error: failed to write {}: {}", index.path().display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
            println!("Cleared {} cache entries", removed);
            ExitCode::from(EXIT_SUCCESS)
        }
    }
}
