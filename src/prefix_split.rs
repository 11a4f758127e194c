use ipnet::IpNet;

pub use split::{
    divide, split_by_host_count, split_into_n, split_subnets, split_subnets_by_host_count, SplitSubnets,
};

/**
Number of prefix bits needed to address `n` subnets, i.e. `ceil(log2(n))`.
 */
pub fn required_bits(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

/**
Whether `n` subnets can be carved out of `base_net` at all. If this is false, splitting
returns the network unchanged.
 */
pub fn can_split(base_net: &IpNet, n: usize) -> bool {
    let available = (base_net.max_prefix_len() - base_net.prefix_len()) as u32;
    n > 1 && available >= required_bits(n)
}

mod split {
    use std::iter::Take;

    use ipnet::{IpNet, IpSubnets};
    use log::debug;
    use num_bigint::BigUint;

    use crate::error::{AlgebraError, AlgebraResult};
    use crate::family::{self, Family};
    use crate::range::{address_count_big, host_bits, int_span};

    use super::can_split;

    /// Splits the network into exactly `n` subnets in ascending address order.
    ///
    /// For a power of two, this extends the prefix by `log2(n)` bits. Otherwise, the network
    /// is split into the largest power of two below `n` first, and then the last subnet is
    /// halved until there are `n` subnets. If `n <= 1` or the network does not have enough
    /// host bits, the (truncated) network is returned as-is.
    pub fn split_into_n(base_net: IpNet, n: usize) -> AlgebraResult<Vec<IpNet>> {
        Ok(split_subnets(base_net, n)?.collect())
    }

    /// Splits the network into subnets of roughly `hosts_per_subnet` addresses each, by
    /// splitting into `total / hosts_per_subnet` (truncated) subnets.
    pub fn split_by_host_count(base_net: IpNet, hosts_per_subnet: u128) -> AlgebraResult<Vec<IpNet>> {
        Ok(split_subnets_by_host_count(base_net, hosts_per_subnet)?.collect())
    }

    /// Lazy form of [split_into_n]. Only the subnet currently being halved is kept, so huge
    /// counts start producing right away. A split that would have to halve a single address
    /// fails here, before anything is produced.
    pub fn split_subnets(base_net: IpNet, n: usize) -> AlgebraResult<SplitSubnets> {
        let base_net = base_net.trunc();
        if !can_split(&base_net, n) {
            debug!("Not splitting {} into {} subnets, not possible", base_net, n);
            return Ok(SplitSubnets::unchanged(base_net));
        }

        let power_bits = n.ilog2() as u8;
        let power_count = 1usize << power_bits;
        let halvings = n - power_count;
        let prefix = base_net.prefix_len() + power_bits;
        let family = Family::of_net(&base_net);
        let (first, last) = int_span(&base_net);

        let last_bits = host_bits(&base_net) - power_bits;
        if halvings > last_bits as usize {
            return Err(AlgebraError::SplitExhausted {
                subnet: family::network_from_integer(last, family.bits(), family)?,
                requested: n,
            });
        }

        let leading = base_net.subnets(prefix).map_err(|_| AlgebraError::InvalidPrefix { prefix, family })?;
        let last_power_first = first + ((power_count as u128 - 1) << last_bits);
        Ok(SplitSubnets {
            leading: Some(leading.take(power_count - 1)),
            halving: Some(family::network_from_integer(last_power_first, prefix, family)?),
            halvings,
            remaining: n,
        })
    }

    pub fn split_subnets_by_host_count(base_net: IpNet, hosts_per_subnet: u128) -> AlgebraResult<SplitSubnets> {
        if hosts_per_subnet == 0 {
            debug!("Not splitting {} into subnets of zero hosts", base_net);
            return Ok(SplitSubnets::unchanged(base_net.trunc()));
        }
        let optimal_split = address_count_big(&base_net) / BigUint::from(hosts_per_subnet);
        let n = usize::try_from(&optimal_split).map_err(|_| AlgebraError::Overflow {
            what: "subnet count for host split",
        })?;
        split_subnets(base_net, n)
    }

    /// Subnets of a split, in ascending address order: the leading power-of-two subnets,
    /// then the lower half of each halving, then the last upper half.
    #[derive(Debug)]
    pub struct SplitSubnets {
        leading: Option<Take<IpSubnets>>,
        halving: Option<IpNet>,
        halvings: usize,
        remaining: usize,
    }

    impl SplitSubnets {
        fn unchanged(net: IpNet) -> Self {
            Self {
                leading: None,
                halving: Some(net),
                halvings: 0,
                remaining: 1,
            }
        }
    }

    impl Iterator for SplitSubnets {
        type Item = IpNet;

        fn next(&mut self) -> Option<Self::Item> {
            let next = match self.leading.as_mut().and_then(Iterator::next) {
                Some(subnet) => subnet,
                None => {
                    let current = self.halving.take()?;
                    if self.halvings == 0 {
                        current
                    } else {
                        self.halvings -= 1;
                        let [lower, upper] = divide(current)?;
                        self.halving = Some(upper);
                        lower
                    }
                }
            };
            self.remaining -= 1;
            Some(next)
        }

        fn size_hint(&self) -> (usize, Option<usize>) {
            (self.remaining, Some(self.remaining))
        }
    }

    impl ExactSizeIterator for SplitSubnets {}

    /// Halves a network into its two children, or [None] for a single address.
    pub fn divide(net: IpNet) -> Option<[IpNet; 2]> {
        let bits = host_bits(&net);
        if bits == 0 {
            return None;
        }
        let family = Family::of_net(&net);
        let prefix = net.prefix_len() + 1;
        let (first, _) = int_span(&net);
        let upper_first = first | (1u128 << (bits - 1));
        let lower = family::network_from_integer(first, prefix, family).ok()?;
        let upper = family::network_from_integer(upper_first, prefix, family).ok()?;
        Some([lower, upper])
    }

}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;
    use crate::test_utils::net;

    #[test]
    fn required_bits_rounds_up() {
        assert_that!(required_bits(0)).is_equal_to(0);
        assert_that!(required_bits(1)).is_equal_to(0);
        assert_that!(required_bits(2)).is_equal_to(1);
        assert_that!(required_bits(3)).is_equal_to(2);
        assert_that!(required_bits(4)).is_equal_to(2);
        assert_that!(required_bits(5)).is_equal_to(3);
    }

    #[test]
    fn can_split_boundary() {
        assert_that!(can_split(&net("10.0.0.0/30"), 4)).is_true();
        assert_that!(can_split(&net("10.0.0.0/30"), 5)).is_false();
        assert_that!(can_split(&net("10.0.0.0/30"), 1)).is_false();
    }
}
