//! Sink implementations

mod log;

pub use self::log::LogSink;
