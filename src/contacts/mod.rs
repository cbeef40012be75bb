pub mod address_book;
pub mod batch;
pub mod mapper;
pub mod model;
pub mod source;

pub use address_book::*;
pub use model::*;
pub use source::*;
