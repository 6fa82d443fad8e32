// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;
use std::str::FromStr;

use crate::{AddressFamily, InterfaceConfig, IpPrefix};

fn to_prefix(address: &str, prefix_len: u8) -> Option<IpPrefix> {
    match IpAddr::from_str(address) {
        Ok(ip) => Some(IpPrefix::new(ip, prefix_len)),
        Err(e) => {
            log::warn!(
                "BUG: nispor got invalid IP address {address}, error {e}"
            );
            None
        }
    }
}

pub(crate) fn np_ipv4_to_netd(np_iface: &nispor::Iface) -> Vec<IpPrefix> {
    np_iface
        .ipv4
        .as_ref()
        .map(|np_ip| {
            np_ip
                .addresses
                .iter()
                .filter_map(|a| to_prefix(&a.address, a.prefix_len))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn np_ipv6_to_netd(np_iface: &nispor::Iface) -> Vec<IpPrefix> {
    np_iface
        .ipv6
        .as_ref()
        .map(|np_ip| {
            np_ip
                .addresses
                .iter()
                .filter_map(|a| to_prefix(&a.address, a.prefix_len))
                .collect()
        })
        .unwrap_or_default()
}

// The address is added on top of existing ones.
pub(crate) fn iface_ip_conf_to_np(
    conf: &InterfaceConfig,
) -> (Option<nispor::IpConf>, Option<nispor::IpConf>) {
    let mut np_addr = nispor::IpAddrConf::default();
    np_addr.address = conf.address.addr.to_string();
    np_addr.prefix_len = conf.address.prefix_len;
    let mut np_ip = nispor::IpConf::default();
    np_ip.addresses = vec![np_addr];
    match conf.family {
        AddressFamily::Inet4 => (Some(np_ip), None),
        AddressFamily::Inet6 => (None, Some(np_ip)),
    }
}
