pub mod analysis;
pub mod api;
pub mod args;
pub mod frequency;
pub mod ident;
pub mod ocr;
pub mod screenshot;
pub mod utils;

pub use analysis::{analyze_words_frequency, AnalysisError, AnalysisResult};
pub use args::{Cli, Commands};
pub use ocr::{TesseractCli, WordRecognizer};
