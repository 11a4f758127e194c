use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::error::{AlgebraError, AlgebraResult};

/// Address family of an address or network. Operations never mix families without an explicit
/// conversion, so most functions in this crate check this first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }

    pub fn of_net(net: &IpNet) -> Self {
        Self::of(&net.addr())
    }

    pub fn from_bits(bits: u8) -> AlgebraResult<Self> {
        match bits {
            32 => Ok(Family::V4),
            128 => Ok(Family::V6),
            other => Err(AlgebraError::UnsupportedFamily {
                width: other as usize / 8,
            }),
        }
    }

    /// Bit width of addresses in this family, i.e. the maximum prefix length.
    pub fn bits(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    pub fn max_value(self) -> u128 {
        match self {
            Family::V4 => u32::MAX as u128,
            Family::V6 => u128::MAX,
        }
    }
}

impl Display for Family {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

/// Numeric value of an address together with its bit width (32 or 128).
pub fn to_integer(addr: &IpAddr) -> (u128, u8) {
    match addr {
        IpAddr::V4(v4) => (u32::from(*v4) as u128, 32),
        IpAddr::V6(v6) => (u128::from(*v6), 128),
    }
}

/// Inverse of [to_integer]. Fails if `bits` is not a known family width or if the value
/// does not fit into it.
pub fn from_integer(value: u128, bits: u8) -> AlgebraResult<IpAddr> {
    match Family::from_bits(bits)? {
        Family::V4 => {
            let v4 = u32::try_from(value).map_err(|_| AlgebraError::Overflow {
                what: "IPv4 address from integer",
            })?;
            Ok(IpAddr::V4(Ipv4Addr::from(v4)))
        }
        Family::V6 => Ok(IpAddr::V6(Ipv6Addr::from(value))),
    }
}

/// Decodes a big-endian octet sequence. The family is inferred from the width.
pub fn from_octets(octets: &[u8]) -> AlgebraResult<IpAddr> {
    if let Ok(v4) = <[u8; 4]>::try_from(octets) {
        Ok(IpAddr::V4(Ipv4Addr::from(v4)))
    } else if let Ok(v6) = <[u8; 16]>::try_from(octets) {
        Ok(IpAddr::V6(Ipv6Addr::from(v6)))
    } else {
        Err(AlgebraError::UnsupportedFamily {
            width: octets.len(),
        })
    }
}

/// Next address, wrapping from the family maximum to zero.
pub fn increment(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4).wrapping_add(1))),
        IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6).wrapping_add(1))),
    }
}

/// Previous address, wrapping from zero to the family maximum.
pub fn decrement(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4).wrapping_sub(1))),
        IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6).wrapping_sub(1))),
    }
}

/// Unsigned numeric ordering of two addresses of the same family.
pub fn compare(left: &IpAddr, right: &IpAddr) -> AlgebraResult<Ordering> {
    ensure_same_family(left, right)?;
    Ok(to_integer(left).0.cmp(&to_integer(right).0))
}

pub fn ensure_same_family(first: &IpAddr, last: &IpAddr) -> AlgebraResult<Family> {
    let family = Family::of(first);
    if family != Family::of(last) {
        return Err(AlgebraError::FamilyMismatch {
            first: *first,
            last: *last,
        });
    }
    Ok(family)
}

/// Builds the network `value/prefix`, masking away any host bits.
pub fn network_from_integer(value: u128, prefix: u8, family: Family) -> AlgebraResult<IpNet> {
    let addr = from_integer(value, family.bits())?;
    network(addr, prefix)
}

/// Builds the network `addr/prefix`, masking away any host bits.
pub fn network(addr: IpAddr, prefix: u8) -> AlgebraResult<IpNet> {
    let invalid = |_| AlgebraError::InvalidPrefix {
        prefix,
        family: Family::of(&addr),
    };
    let net = match addr {
        IpAddr::V4(v4) => IpNet::V4(Ipv4Net::new(v4, prefix).map_err(invalid)?),
        IpAddr::V6(v6) => IpNet::V6(Ipv6Net::new(v6, prefix).map_err(invalid)?),
    };
    Ok(net.trunc())
}

/// Parses a bare address (as a host route) or a CIDR (with host bits truncated).
pub fn parse_network(input: &str) -> Option<IpNet> {
    let input = input.trim();
    if input.contains('/') {
        input.parse::<IpNet>().ok().map(|it| it.trunc())
    } else {
        input.parse::<IpAddr>().ok().map(IpNet::from)
    }
}

/// Smallest network that contains both addresses.
pub fn common_supernet(left: &IpAddr, right: &IpAddr) -> AlgebraResult<IpNet> {
    let family = ensure_same_family(left, right)?;
    let (left_int, _) = to_integer(left);
    let (right_int, _) = to_integer(right);
    // v4 values live in the low 32 bits, so the upper 96 are always shared
    let unused_bits = 128 - family.bits() as u32;
    let shared = (left_int ^ right_int).leading_zeros() - unused_bits;
    network(*left, shared as u8)
}
