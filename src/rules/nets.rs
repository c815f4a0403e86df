use std::collections::HashMap;

use bimap::BiHashMap;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Net numbers start at 1. A net without an explicit class belongs to the
/// default net class 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Nets {
    // net <-> netname
    net_netname: BiHashMap<usize, String>,
    // net -> net class
    net_netclass: HashMap<usize, usize>,
}

impl Nets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, netname: &str, net_class: usize) -> usize {
        if let Some(net) = self.netname_net(netname) {
            log::warn!("net {} exists already as {}", netname, net);
            return net;
        }

        let net = self.max_net_no() + 1;
        self.net_netname.insert(net, netname.to_string());
        self.net_netclass.insert(net, net_class);
        net
    }

    pub fn max_net_no(&self) -> usize {
        self.net_netname.left_values().copied().max().unwrap_or(0)
    }

    pub fn net_netname(&self, net: usize) -> Option<&str> {
        self.net_netname.get_by_left(&net).map(|s| s.as_str())
    }

    pub fn netname_net(&self, netname: &str) -> Option<usize> {
        self.net_netname.get_by_right(netname).copied()
    }

    pub fn net_class(&self, net: usize) -> usize {
        self.net_netclass.get(&net).copied().unwrap_or(0)
    }

    pub fn set_net_class(&mut self, net: usize, net_class: usize) {
        self.net_netclass.insert(net, net_class);
    }
}

#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct NetClass {
    name: String,
    /// A trace connecting twice to the same conduction area is kept.
    #[serde(default)]
    ignore_cycles_with_areas: bool,
    /// Traces of the class may be moved by the optimizer.
    #[serde(default = "default_pull_tight")]
    pull_tight: bool,
}

fn default_pull_tight() -> bool {
    true
}

impl NetClass {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ignore_cycles_with_areas: false,
            pull_tight: true,
        }
    }

    pub fn with_ignore_cycles_with_areas(mut self, value: bool) -> Self {
        self.ignore_cycles_with_areas = value;
        self
    }

    pub fn with_pull_tight(mut self, value: bool) -> Self {
        self.pull_tight = value;
        self
    }
}
