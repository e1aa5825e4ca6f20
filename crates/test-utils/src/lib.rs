pub mod builders;
pub mod fake_backend;

use std::sync::{Arc, Once, RwLock};

use tracing_subscriber::{EnvFilter, fmt};
use wavebuild::build::{Builder, WorkerPools};
use wavebuild::engine::{EventSink, Manager};
use wavebuild::types::BuildMode;
use wavebuild::watch::WatchRegistry;

pub use builders::{InMemoryLoader, TargetBuilder};
pub use fake_backend::{FakeBackend, RecordingSink};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Small pools for tests.
pub fn test_pools() -> Arc<WorkerPools> {
    Arc::new(WorkerPools::new(2, 2).expect("create test pools"))
}

/// A builder that dispatches every mode to `backend`.
pub fn fake_builder(backend: Arc<FakeBackend>, sink: Arc<dyn EventSink>) -> Builder {
    let mut builder = Builder::new(sink);
    for mode in [BuildMode::CppLibrary, BuildMode::CppBinary, BuildMode::Command] {
        builder.register_backend(mode, backend.clone());
    }
    builder
}

/// A manager over an in-memory loader and a fake backend.
pub fn fake_manager(
    loader: Arc<InMemoryLoader>,
    backend: Arc<FakeBackend>,
    sink: Arc<RecordingSink>,
) -> Manager {
    Manager::new(
        loader,
        fake_builder(backend, sink.clone()),
        test_pools(),
        Arc::new(RwLock::new(WatchRegistry::new("BUILD.toml"))),
        sink,
    )
}
