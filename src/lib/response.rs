// SPDX-License-Identifier: Apache-2.0

use crate::{ConfigEntry, InterfaceInfo, InterfaceType, IpPrefix, RouteInfo};

const USAGE: &str = "\
Commands:
  show                                        Show this help
  show interface [<type>|<ifname>]            Show interfaces
  show route [fib N] [protocol static|dynamic] [inet|inet6]
                                              Show routing table of a FIB
  set interface <ifname> inet|inet6 addr <address>[/<prefix>]
      [fib N] [tunnelfib N]                   Stage an interface address
  set route protocol static [fib N] inet|inet6 <destination> <gateway>
                                              Stage a static route
  delete route protocol static [fib N] [inet|inet6 [<destination> [<gateway>]]]
                                              Delete static routes now
  commit                                      Apply staged changes
  discard                                     Drop staged changes
  save                                        Persist running configuration";

const EMPTY_CELL: &str = "-";

/// Successful outcome of one dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Help,
    Interfaces(Vec<InterfaceInfo>),
    Routes { fib: u32, routes: Vec<RouteInfo> },
    Staged { entry: ConfigEntry, pending: usize },
    Deleted(usize),
    Committed(usize),
    Discarded(usize),
    Saved(String),
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Help => {
                write!(f, "{USAGE}\n\nInterface types:\n  ")?;
                let types: Vec<&str> = InterfaceType::FILTERABLE
                    .iter()
                    .map(|t| t.filter_name())
                    .collect();
                write!(f, "{}", types.join(", "))
            }
            Self::Interfaces(ifaces) => {
                let mut table = Table::new(&[
                    "Interface",
                    "IPv4 Address",
                    "IPv6 Address",
                    "VRF",
                    "TunnelVRF",
                    "MTU",
                ]);
                for iface in ifaces {
                    table.push(vec![
                        iface.name.clone(),
                        join_addrs(&iface.ipv4),
                        join_addrs(&iface.ipv6),
                        iface.fib.to_string(),
                        opt_cell(iface.tunnel_fib),
                        opt_cell(iface.mtu),
                    ]);
                }
                write!(f, "{table}")
            }
            Self::Routes { fib, routes } => {
                let mut table =
                    Table::new(&["Destination", "Gateway", "Flags", "Netif"]);
                for route in routes {
                    table.push(vec![
                        route.destination.to_string(),
                        opt_cell(route.gateway),
                        route.flags(),
                        opt_cell(route.interface.as_ref()),
                    ]);
                }
                write!(f, "FIB {fib}:\n{table}")
            }
            Self::Staged { entry, pending } => write!(
                f,
                "Staged {entry}, {pending} change(s) pending, use 'commit' \
                to apply"
            ),
            Self::Deleted(count) => write!(f, "Deleted {count} route(s)"),
            Self::Committed(count) => {
                write!(f, "Committed {count} change(s) successfully")
            }
            Self::Discarded(count) => {
                write!(f, "Discarded {count} pending change(s)")
            }
            Self::Saved(location) => {
                write!(f, "Configuration saved to {location}")
            }
        }
    }
}

fn join_addrs(addrs: &[IpPrefix]) -> String {
    if addrs.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        addrs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<String>>()
            .join(",")
    }
}

fn opt_cell<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| EMPTY_CELL.to_string())
}

// Left aligned text table, each column as wide as its widest cell.
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut ret: Vec<usize> =
            self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in ret.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        ret
    }

    fn write_row(
        f: &mut std::fmt::Formatter<'_>,
        widths: &[usize],
        row: &[String],
    ) -> std::fmt::Result {
        let mut line = String::new();
        for (cell, width) in row.iter().zip(widths) {
            line.push_str(&format!("{cell:<width$} "));
        }
        write!(f, "{}", line.trim_end())
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let widths = self.widths();
        Self::write_row(f, &widths, &self.headers)?;
        for row in &self.rows {
            writeln!(f)?;
            Self::write_row(f, &widths, row)?;
        }
        Ok(())
    }
}
