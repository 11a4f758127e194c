use std::net::IpAddr;

use ipnet::IpNet;
use thiserror::Error;

use crate::family::Family;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgebraError {
    #[error("unsupported address width: {width} bytes (expected 4 or 16)")]
    UnsupportedFamily { width: usize },

    #[error("addresses `{first}` and `{last}` are of different families")]
    FamilyMismatch { first: IpAddr, last: IpAddr },

    #[error("prefix length /{prefix} is out of range for {family}")]
    InvalidPrefix { prefix: u8, family: Family },

    #[error("invalid range: last address `{last}` precedes first address `{first}`")]
    InvalidRange { first: IpAddr, last: IpAddr },

    #[error("cannot divide subnet `{subnet}` further to reach {requested} splits")]
    SplitExhausted { subnet: IpNet, requested: usize },

    #[error("arithmetic overflow while computing {what}")]
    Overflow { what: &'static str },
}

pub type AlgebraResult<T> = Result<T, AlgebraError>;
