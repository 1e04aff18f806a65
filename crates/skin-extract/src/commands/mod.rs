mod config;
mod extract;
mod scan;

pub use config::*;
pub use extract::*;
pub use scan::*;
