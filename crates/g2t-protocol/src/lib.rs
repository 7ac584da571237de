pub mod charger;
pub mod owner;

pub use charger::*;
pub use owner::*;
