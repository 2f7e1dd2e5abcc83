mod category;
mod common;
mod product;
mod stats;
mod user;

pub use category::*;
pub use common::*;
pub use product::*;
pub use stats::*;
pub use user::*;
