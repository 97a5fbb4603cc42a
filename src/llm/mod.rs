pub mod assessor;
#[cfg(feature = "gemini")]
pub mod client;
pub mod extractor;
pub mod feedback;
pub mod generator;
pub mod prompts;
pub mod router;
pub mod types;
pub mod utils;

pub use assessor::*;
#[cfg(feature = "gemini")]
pub use client::*;
pub use extractor::*;
pub use feedback::*;
pub use generator::*;
pub use router::*;
pub use types::*;
pub use utils::*;
