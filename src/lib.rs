pub mod contacts;
pub mod contract;
pub mod error;
pub mod geo;
pub mod media;
pub mod query;

pub use contacts::{AddressBook, Contact, ContentSource, NativeQuery};
pub use error::Error;
pub use geo::{Geolocator, LocationSink, LocationSource, Position};
pub use media::{MediaFile, MediaPicker, StoreMediaOptions};
pub use query::{Expr, QueryChain, QueryOutcome, Translation, Translator};
