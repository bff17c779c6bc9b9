mod barrier;
mod non_blocking;
mod synchronizer;

pub use barrier::BarrierSync;
pub use non_blocking::NoBlockingSync;
pub use synchronizer::Synchronizer;
