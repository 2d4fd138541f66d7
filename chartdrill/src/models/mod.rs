pub mod chart;
pub mod request;
pub mod result;

pub use chart::*;
pub use request::*;
pub use result::*;
