pub mod limiter;
pub mod pan;
pub mod resampler;
