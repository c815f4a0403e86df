//! Serializable description of a board, used to load and store boards as
//! JSON.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    board::{
        board::Board,
        item::{
            AccessItem, BoardOutline, ComponentOutline, ConductionArea, FixedState, Item,
            ObstacleArea, Pin, PolylineTrace, Via,
        },
    },
    geometry::{IntBox, IntPoint, Line, Polyline},
    rules::BoardRules,
};

#[derive(Error, Debug)]
pub enum DescriptionError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("item {item} is on layer {layer}, the board has {layer_count} layers")]
    LayerOutOfRange {
        item: usize,
        layer: usize,
        layer_count: usize,
    },
    #[error("trace {0} has fewer than 2 distinct corners")]
    DegenerateTrace(usize),
    #[error("area {0} has fewer than 3 corners")]
    DegenerateArea(usize),
}

/// Path of a trace, either through integer corners or, for traces whose
/// corners are not on the grid, as its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TracePath {
    Corners(Vec<IntPoint>),
    Lines(Vec<Line>),
}

impl TracePath {
    fn of(polyline: &Polyline) -> Self {
        let corners: Option<Vec<IntPoint>> = polyline.corners().iter().map(|p| p.as_int()).collect();

        match corners {
            Some(corners) => TracePath::Corners(corners),
            None => TracePath::Lines(polyline.lines().to_vec()),
        }
    }

    fn to_polyline(&self) -> Polyline {
        match self {
            TracePath::Corners(corners) => Polyline::from_corners(corners),
            TracePath::Lines(lines) => Polyline::new(lines.iter().copied()),
        }
    }
}

fn default_clearance_class() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemDescription {
    Trace {
        path: TracePath,
        layer: usize,
        half_width: i64,
        nets: Vec<usize>,
        #[serde(default = "default_clearance_class")]
        clearance_class: usize,
        #[serde(default)]
        fixed_state: FixedState,
    },
    Via {
        center: IntPoint,
        first_layer: usize,
        last_layer: usize,
        radius: i64,
        nets: Vec<usize>,
        #[serde(default = "default_clearance_class")]
        clearance_class: usize,
        #[serde(default)]
        fixed_state: FixedState,
    },
    Pin {
        center: IntPoint,
        first_layer: usize,
        last_layer: usize,
        pad_half_width: i64,
        pad_half_height: i64,
        nets: Vec<usize>,
        #[serde(default = "default_clearance_class")]
        clearance_class: usize,
    },
    ConductionArea {
        corners: Vec<IntPoint>,
        layer: usize,
        nets: Vec<usize>,
        #[serde(default = "default_clearance_class")]
        clearance_class: usize,
        #[serde(default)]
        is_obstacle: bool,
    },
    ObstacleArea {
        corners: Vec<IntPoint>,
        layer: usize,
        #[serde(default)]
        nets: Vec<usize>,
        #[serde(default = "default_clearance_class")]
        clearance_class: usize,
    },
    ComponentOutline {
        corners: Vec<IntPoint>,
        layer: usize,
    },
    BoardOutline {
        corners: Vec<IntPoint>,
        #[serde(default = "default_clearance_class")]
        clearance_class: usize,
    },
}

impl ItemDescription {
    fn of(item: &Item) -> Self {
        match item {
            Item::Trace(trace) => ItemDescription::Trace {
                path: TracePath::of(trace.polyline()),
                layer: trace.layer(),
                half_width: trace.half_width(),
                nets: trace.nets().to_vec(),
                clearance_class: trace.clearance_class(),
                fixed_state: trace.fixed_state(),
            },
            Item::Via(via) => ItemDescription::Via {
                center: via.center(),
                first_layer: via.first_layer(),
                last_layer: via.last_layer(),
                radius: via.radius(),
                nets: via.nets().to_vec(),
                clearance_class: via.clearance_class(),
                fixed_state: via.fixed_state(),
            },
            Item::Pin(pin) => ItemDescription::Pin {
                center: pin.center(),
                first_layer: pin.first_layer(),
                last_layer: pin.last_layer(),
                pad_half_width: pin.pad_half_width(),
                pad_half_height: pin.pad_half_height(),
                nets: pin.nets().to_vec(),
                clearance_class: pin.clearance_class(),
            },
            Item::ConductionArea(area) => ItemDescription::ConductionArea {
                corners: area.corners().to_vec(),
                layer: area.layer(),
                nets: area.nets().to_vec(),
                clearance_class: area.clearance_class(),
                is_obstacle: area.get_is_obstacle(),
            },
            Item::ObstacleArea(area) => ItemDescription::ObstacleArea {
                corners: area.corners().to_vec(),
                layer: area.layer(),
                nets: area.nets().to_vec(),
                clearance_class: area.clearance_class(),
            },
            Item::ComponentOutline(outline) => ItemDescription::ComponentOutline {
                corners: outline.corners().to_vec(),
                layer: outline.layer(),
            },
            Item::BoardOutline(outline) => ItemDescription::BoardOutline {
                corners: outline.corners().to_vec(),
                clearance_class: outline.clearance_class(),
            },
        }
    }

    fn layers(&self) -> Vec<usize> {
        match self {
            ItemDescription::Trace { layer, .. }
            | ItemDescription::ConductionArea { layer, .. }
            | ItemDescription::ObstacleArea { layer, .. }
            | ItemDescription::ComponentOutline { layer, .. } => vec![*layer],
            ItemDescription::Via {
                first_layer,
                last_layer,
                ..
            }
            | ItemDescription::Pin {
                first_layer,
                last_layer,
                ..
            } => vec![*first_layer, *last_layer],
            ItemDescription::BoardOutline { .. } => vec![],
        }
    }

    fn to_item(&self, number: usize, layer_count: usize) -> Result<Item, DescriptionError> {
        if let Some(&layer) = self.layers().iter().find(|&&layer| layer >= layer_count) {
            return Err(DescriptionError::LayerOutOfRange {
                item: number,
                layer,
                layer_count,
            });
        }

        let item = match self.clone() {
            ItemDescription::Trace {
                path,
                layer,
                half_width,
                nets,
                clearance_class,
                fixed_state,
            } => {
                let polyline = path.to_polyline();

                if polyline.corner_count() < 2 {
                    return Err(DescriptionError::DegenerateTrace(number));
                }

                Item::Trace(PolylineTrace::new(
                    polyline,
                    layer,
                    half_width,
                    nets,
                    clearance_class,
                    fixed_state,
                ))
            }
            ItemDescription::Via {
                center,
                first_layer,
                last_layer,
                radius,
                nets,
                clearance_class,
                fixed_state,
            } => Item::Via(Via::new(
                center,
                first_layer,
                last_layer,
                radius,
                nets,
                clearance_class,
                fixed_state,
            )),
            ItemDescription::Pin {
                center,
                first_layer,
                last_layer,
                pad_half_width,
                pad_half_height,
                nets,
                clearance_class,
            } => Item::Pin(Pin::new(
                center,
                first_layer,
                last_layer,
                pad_half_width,
                pad_half_height,
                nets,
                clearance_class,
            )),
            ItemDescription::ConductionArea {
                corners,
                layer,
                nets,
                clearance_class,
                is_obstacle,
            } => {
                if corners.len() < 3 {
                    return Err(DescriptionError::DegenerateArea(number));
                }

                Item::ConductionArea(ConductionArea::new(corners, layer, nets, clearance_class, is_obstacle))
            }
            ItemDescription::ObstacleArea {
                corners,
                layer,
                nets,
                clearance_class,
            } => {
                if corners.len() < 3 {
                    return Err(DescriptionError::DegenerateArea(number));
                }

                Item::ObstacleArea(ObstacleArea::new(corners, layer, nets, clearance_class))
            }
            ItemDescription::ComponentOutline { corners, layer } => {
                Item::ComponentOutline(ComponentOutline::new(corners, layer))
            }
            ItemDescription::BoardOutline {
                corners,
                clearance_class,
            } => {
                if corners.len() < 3 {
                    return Err(DescriptionError::DegenerateArea(number));
                }

                Item::BoardOutline(BoardOutline::new(corners, layer_count, clearance_class))
            }
        };

        Ok(item)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDescription {
    pub rules: BoardRules,
    pub bounding_box: IntBox,
    #[serde(default)]
    pub items: Vec<ItemDescription>,
}

impl BoardDescription {
    pub fn from_reader(reader: impl Read) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_writer(&self, writer: impl Write) -> Result<(), DescriptionError> {
        Ok(serde_json::to_writer_pretty(writer, self)?)
    }
}

impl Board {
    /// Builds a board from its description. Items are inserted as they
    /// are, without splitting or combining traces.
    pub fn from_description(description: BoardDescription) -> Result<Self, DescriptionError> {
        let layer_count = description.rules.layer_count();
        let mut board = Board::new(description.rules, description.bounding_box);

        for (number, item) in description.items.iter().enumerate() {
            board.add_item(item.to_item(number, layer_count)?);
        }

        log::debug!("loaded board with {} items", board.item_count());
        Ok(board)
    }

    pub fn to_description(&self) -> BoardDescription {
        BoardDescription {
            rules: self.rules().clone(),
            bounding_box: self.bounding_box(),
            items: self
                .item_indices()
                .into_iter()
                .map(|index| ItemDescription::of(&self.graph[index]))
                .collect(),
        }
    }

    pub fn from_json_reader(reader: impl Read) -> Result<Self, DescriptionError> {
        Self::from_description(BoardDescription::from_reader(reader)?)
    }

    pub fn to_json_writer(&self, writer: impl Write) -> Result<(), DescriptionError> {
        self.to_description().to_writer(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"{
        "rules": null,
        "bounding_box": { "ll": { "x": 0, "y": 0 }, "ur": { "x": 10000, "y": 10000 } },
        "items": [
            { "kind": "trace", "path": [{ "x": 0, "y": 0 }, { "x": 1000, "y": 0 }],
              "layer": 0, "half_width": 50, "nets": [1] },
            { "kind": "via", "center": { "x": 2000, "y": 0 }, "first_layer": 0,
              "last_layer": 1, "radius": 100, "nets": [1] }
        ]
    }"#;

    fn description() -> BoardDescription {
        let mut value: serde_json::Value = serde_json::from_str(BOARD).unwrap();
        value["rules"] = serde_json::to_value(BoardRules::new(2, 100)).unwrap();
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn loads_items_in_order() {
        let board = Board::from_description(description()).unwrap();
        assert_eq!(board.item_count(), 2);
        assert_eq!(board.trace_indices().len(), 1);

        let stored = board.to_description();
        assert_eq!(stored.items, description().items);
    }

    #[test]
    fn rejects_item_on_missing_layer() {
        let mut description = description();
        description.items.push(ItemDescription::ObstacleArea {
            corners: vec![IntPoint::new(0, 0), IntPoint::new(10, 0), IntPoint::new(0, 10)],
            layer: 5,
            nets: vec![],
            clearance_class: 1,
        });

        assert!(matches!(
            Board::from_description(description),
            Err(DescriptionError::LayerOutOfRange { item: 2, layer: 5, .. })
        ));
    }
}
