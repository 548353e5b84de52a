//! Reading, checking and rewriting Qt Linguist `.ts` translation catalogues.

pub mod config;
pub mod error;
pub mod model;
pub mod parsers;
pub mod protocol;
pub mod services;

pub use error::{CoreError, CoreResult};
pub use model::document::{TsContext, TsDocument};
pub use model::entry::{LineRef, Location, Translation, TranslationText, TranslationType, TsMessage};
