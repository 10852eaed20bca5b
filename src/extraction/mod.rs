//! Entity and relation extraction over a chunk corpus.

pub mod acronyms;
pub mod keyterms;
pub mod structural;

pub use acronyms::AcronymDictionary;
pub use keyterms::KeyTermExtractor;
pub use structural::StructuralExtractor;
