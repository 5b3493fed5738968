mod benchmark;

pub use benchmark::{
    BenchmarkCatalog, BenchmarkError, BenchmarkRecord, BenchmarkScores, Confidence,
    validate_records,
};
