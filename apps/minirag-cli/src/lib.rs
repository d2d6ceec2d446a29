//! Shared plumbing for the `minirag` binaries.
use minirag_core::ErrorKind;
use tracing_subscriber::EnvFilter;

pub mod server;

/// Install the fmt subscriber on stderr. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).try_init();
}

/// Process exit code for a failed command. Every error kind gets its own code.
pub fn exit_code(kind: Option<ErrorKind>) -> u8 {
    match kind {
        None => 1,
        Some(ErrorKind::InvalidInput) => 2,
        Some(ErrorKind::DocumentLoad) => 3,
        Some(ErrorKind::Chunking) => 4,
        Some(ErrorKind::EmbeddingService) => 5,
        Some(ErrorKind::VectorStore) => 6,
        Some(ErrorKind::Rerank) => 7,
        Some(ErrorKind::Generation) => 8,
        Some(ErrorKind::Timeout) => 9,
        Some(ErrorKind::InvalidConfig) => 10,
        Some(ErrorKind::DimensionMismatch) => 11,
    }
}

/// Kind of the library error behind an `anyhow` chain, if any.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain().find_map(|e| e.downcast_ref::<minirag_core::Error>()).map(minirag_core::Error::kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn kinds_get_distinct_exit_codes() {
        let kinds = [
            ErrorKind::InvalidInput,
            ErrorKind::DocumentLoad,
            ErrorKind::Chunking,
            ErrorKind::EmbeddingService,
            ErrorKind::VectorStore,
            ErrorKind::Rerank,
            ErrorKind::Generation,
            ErrorKind::Timeout,
            ErrorKind::InvalidConfig,
            ErrorKind::DimensionMismatch,
        ];
        let codes: std::collections::HashSet<u8> = kinds.iter().map(|k| exit_code(Some(*k))).collect();
        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&0) && !codes.contains(&1));
        assert_eq!(exit_code(None), 1);
    }

    #[test]
    fn kind_survives_context() {
        let err = Err::<(), _>(minirag_core::Error::InvalidInput("blank".into())).context("query failed").unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::InvalidInput));
    }
}
