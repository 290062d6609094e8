mod driver;
mod fetch_object;
mod profiler;

pub use driver::{Connector, DatabaseDriver, PlaceholderStyle};
pub use fetch_object::FetchObject;
pub use profiler::{NoopProfiler, Profiler};
