mod memory;

pub use self::memory::{MemoryProfiler, ProfileEntry, ProfileOutcome};
