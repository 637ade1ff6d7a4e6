use std::sync::LazyLock;

/// Version of the software as reported by `--version` and the run log.
pub static VERSION: LazyLock<String> =
    LazyLock::new(|| env!("CARGO_PKG_VERSION").to_string());
