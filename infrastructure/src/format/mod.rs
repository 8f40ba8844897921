//! Text format adapters that isolate sections of model output.

mod tagged;

pub use tagged::TaggedSectionFormat;
