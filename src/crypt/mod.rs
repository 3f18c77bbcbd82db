pub mod luks;

pub use luks::*;
