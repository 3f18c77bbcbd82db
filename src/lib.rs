pub mod assemble;
pub mod cmd;
pub mod config;
pub mod crypt;
pub mod desktop;
pub mod error;
pub mod host;
pub mod job;
pub mod keymap;
pub mod paths;
pub mod snippet;
pub mod storage;
pub mod template;
pub mod unfree;

#[cfg(test)]
mod testing;
