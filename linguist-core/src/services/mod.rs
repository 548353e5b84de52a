pub mod encoding;
pub mod merge;
pub mod pipeline;
pub mod qa;
pub mod rebuild;
pub mod stats;
pub mod storage;
pub mod translation_memory;
