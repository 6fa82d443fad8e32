// SPDX-License-Identifier: Apache-2.0

use crate::{
    nispor::{ip::iface_ip_conf_to_np, np_error_to_netd, vrf_name},
    InterfaceConfig, NetdError,
};

pub(crate) fn iface_conf_to_np(conf: &InterfaceConfig) -> nispor::IfaceConf {
    let (ipv4, ipv6) = iface_ip_conf_to_np(conf);
    let mut np_conf = nispor::IfaceConf::default();
    np_conf.name = conf.name.to_string();
    np_conf.state = nispor::IfaceState::Up;
    // Empty controller detaches the interface from any VRF
    np_conf.controller = Some(if conf.fib == 0 {
        String::new()
    } else {
        vrf_name(conf.fib)
    });
    np_conf.ipv4 = ipv4;
    np_conf.ipv6 = ipv6;
    np_conf
}

pub(crate) fn apply_conf(np_conf: &nispor::NetConf) -> Result<(), NetdError> {
    log::debug!("Applying nispor config {:?}", np_conf);
    np_conf.apply().map_err(np_error_to_netd)
}
