mod benchmarks;
mod og_image;

pub use benchmarks::BenchmarkService;
pub use og_image::{OgImageParams, Theme, render_og_image};
