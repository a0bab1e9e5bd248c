//! A time-bounded adversarial search engine, with Ashton Tablut as its main game.

pub mod evaluation;
pub mod position;
#[cfg(feature = "serde")]
pub mod protocol;
pub mod search;

#[cfg(test)]
mod tests;
