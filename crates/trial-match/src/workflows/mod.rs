pub mod catalog;
pub mod matching;
