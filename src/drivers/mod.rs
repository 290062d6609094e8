mod in_memory_test;
mod pg_value;
mod tokio_postgres;

pub use self::in_memory_test::{InMemoryTestDriver, InMemoryTestResponseBuilder, RecordedQuery};
pub use self::tokio_postgres::{TokioPostgresConnector, TokioPostgresDriver};
