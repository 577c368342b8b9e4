//! Program driver.
//!
//! Takes a parsed program through generation, verification and emission and
//! reports diagnostics the way a compiler front end does.

pub mod driver;
pub mod emitter;

#[cfg(test)]
mod tests;
