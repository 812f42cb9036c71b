mod backoff;
mod config;
mod interface;
mod mutex;
mod snowflake;
mod status;
#[cfg(test)]
mod tests;

pub use backoff::*;
pub use config::*;
pub use interface::*;
pub(crate) use mutex::*;
pub use snowflake::*;
pub use status::*;
