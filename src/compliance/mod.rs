pub mod evaluator;
pub mod rules;
pub mod transcript;

pub use evaluator::*;
pub use rules::*;
pub use transcript::*;
