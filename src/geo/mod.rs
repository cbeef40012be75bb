pub mod geolocator;
pub mod position;
pub mod single_fix;

pub use geolocator::*;
pub use position::*;
pub use single_fix::*;
