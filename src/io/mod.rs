mod directory;
mod export;

pub use directory::*;
pub use export::*;
