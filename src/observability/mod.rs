mod tracing_init;

pub use tracing_init::init_tracing;
