//! Design rules shared by all algorithms working on a board.

mod clearance_matrix;
mod nets;

pub use clearance_matrix::ClearanceMatrix;
pub use nets::{NetClass, Nets};

use bimap::BiHashMap;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AngleRestriction {
    NinetyDegree,
    #[default]
    FortyFiveDegree,
    AnyAngle,
}

#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct BoardRules {
    clearance_matrix: ClearanceMatrix,
    nets: Nets,
    net_classes: Vec<NetClass>,
    // layer <-> layername
    #[getter(skip)]
    layer_layername: BiHashMap<usize, String>,
}

impl BoardRules {
    pub fn new(layer_count: usize, default_clearance: i64) -> Self {
        Self {
            clearance_matrix: ClearanceMatrix::new(layer_count, default_clearance),
            nets: Nets::new(),
            net_classes: vec![NetClass::new("default")],
            layer_layername: BiHashMap::from_iter(
                (0..layer_count.max(1)).map(|layer| (layer, format!("L{}", layer + 1))),
            ),
        }
    }

    pub fn layer_count(&self) -> usize {
        self.clearance_matrix.layer_count()
    }

    pub fn clearance_matrix_mut(&mut self) -> &mut ClearanceMatrix {
        &mut self.clearance_matrix
    }

    pub fn nets_mut(&mut self) -> &mut Nets {
        &mut self.nets
    }

    pub fn add_net_class(&mut self, net_class: NetClass) -> usize {
        self.net_classes.push(net_class);
        self.net_classes.len() - 1
    }

    pub fn bename_layer(&mut self, layer: usize, layername: String) {
        self.layer_layername.insert(layer, layername);
    }

    pub fn layer_layername(&self, layer: usize) -> Option<&str> {
        self.layer_layername.get_by_left(&layer).map(|s| s.as_str())
    }

    pub fn layername_layer(&self, layername: &str) -> Option<usize> {
        self.layer_layername.get_by_right(layername).copied()
    }

    pub fn net_class(&self, net: usize) -> &NetClass {
        self.net_classes
            .get(self.nets.net_class(net))
            .unwrap_or(&self.net_classes[0])
    }

    /// Cycles through conduction areas are kept if any of the nets asks for
    /// it.
    pub fn ignore_cycles_with_areas(&self, nets: &[usize]) -> bool {
        nets.iter()
            .any(|&net| *self.net_class(net).ignore_cycles_with_areas())
    }

    /// Only traces whose first net allows it are pulled tight.
    pub fn is_pull_tight(&self, nets: &[usize]) -> bool {
        nets.first()
            .map_or(true, |&net| *self.net_class(net).pull_tight())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_are_named_both_ways() {
        let mut rules = BoardRules::new(2, 100);
        assert_eq!(rules.layer_layername(0), Some("L1"));
        assert_eq!(rules.layername_layer("L2"), Some(1));

        rules.bename_layer(1, "Bottom".to_string());
        assert_eq!(rules.layer_layername(1), Some("Bottom"));
        assert_eq!(rules.layername_layer("Bottom"), Some(1));
        assert_eq!(rules.layer_layername(2), None);
    }

    #[test]
    fn net_class_flags_follow_the_nets() {
        let mut rules = BoardRules::new(1, 100);
        let keep = rules.add_net_class(
            NetClass::new("keep")
                .with_ignore_cycles_with_areas(true)
                .with_pull_tight(false),
        );
        let gnd = rules.nets_mut().add("GND", keep);
        let sig = rules.nets_mut().add("SIG", 0);

        assert_eq!(rules.net_class(gnd).name(), "keep");
        assert!(rules.ignore_cycles_with_areas(&[sig, gnd]));
        assert!(!rules.ignore_cycles_with_areas(&[sig]));
        assert!(!rules.is_pull_tight(&[gnd, sig]));
        assert!(rules.is_pull_tight(&[sig]));
        assert_eq!(rules.net_classes().len(), 2);
    }
}
