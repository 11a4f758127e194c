pub mod aggregate;
pub mod asn;
pub mod count;
pub mod enumerate;
pub mod error;
pub mod family;
pub mod filter;
pub mod helpers;
pub mod prefix_split;
pub mod range;
pub mod shuffle;
pub mod stream;

#[cfg(test)]
pub mod test_utils;

pub use error::{AlgebraError, AlgebraResult};
pub use family::Family;
pub use range::AddressRange;
pub use shuffle::ShuffleItem;
