#[macro_use]
mod id;
pub mod sync;
