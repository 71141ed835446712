//! Domain models for field sampling campaigns

mod analysis;
mod campaign;
mod geodata;
mod parcel;
mod sampling_point;
mod zone;

pub use analysis::*;
pub use campaign::*;
pub use geodata::*;
pub use parcel::*;
pub use sampling_point::*;
pub use zone::*;
