use enum_dispatch::enum_dispatch;
use geo::{Centroid, Contains, LineString, Polygon};
use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};

use crate::{
    geometry::{
        AccessTileShape, FloatPoint, IntBox, IntOctagon, IntPoint, Point, Polyline, Simplex,
        TileShape,
    },
    math::{self, SQRT2},
};

pub type ItemIndex = NodeIndex<usize>;

/// How strongly an item is protected from being moved by the algorithms.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FixedState {
    #[default]
    Unfixed,
    ShoveFixed,
    UserFixed,
    SystemFixed,
}

#[enum_dispatch]
pub trait AccessItem {
    fn tile_shape_count(&self) -> usize;
    /// Shape `index` without any clearance compensation.
    fn tile_shape(&self, index: usize) -> Option<TileShape>;
    fn shape_layer(&self, index: usize) -> usize;
    /// True if `other` may not overlap this item.
    fn is_obstacle(&self, other: &Item) -> bool;
    /// True if a trace of the given nets may not overlap this item.
    fn is_trace_obstacle(&self, nets: &[usize]) -> bool;
    fn clearance_class(&self) -> usize;
    fn nets(&self) -> &[usize];
    fn fixed_state(&self) -> FixedState;

    /// Shape `index` widened by `offset`.
    fn offset_tile_shape(&self, index: usize, offset: f64) -> Option<TileShape> {
        self.tile_shape(index).map(|shape| shape.enlarge(offset))
    }

    fn is_on_layer(&self, layer: usize) -> bool {
        (0..self.tile_shape_count()).any(|i| self.shape_layer(i) == layer)
    }

    fn is_shove_fixed(&self) -> bool {
        self.fixed_state() >= FixedState::ShoveFixed
    }

    fn is_user_fixed(&self) -> bool {
        self.fixed_state() >= FixedState::UserFixed
    }

    fn contains_net(&self, net: usize) -> bool {
        self.nets().contains(&net)
    }

    fn shares_net(&self, nets: &[usize]) -> bool {
        self.nets().iter().any(|net| nets.contains(net))
    }
}

#[enum_dispatch(AccessItem)]
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Trace(PolylineTrace),
    Via(Via),
    Pin(Pin),
    ConductionArea(ConductionArea),
    ObstacleArea(ObstacleArea),
    ComponentOutline(ComponentOutline),
    BoardOutline(BoardOutline),
}

impl Item {
    pub fn as_trace(&self) -> Option<&PolylineTrace> {
        match self {
            Item::Trace(trace) => Some(trace),
            _ => None,
        }
    }

    /// Center of vias and pins.
    pub fn drill_center(&self) -> Option<IntPoint> {
        match self {
            Item::Via(via) => Some(via.center),
            Item::Pin(pin) => Some(pin.center),
            _ => None,
        }
    }

    pub fn is_drill_item(&self) -> bool {
        self.drill_center().is_some()
    }

    pub fn is_conduction_area(&self) -> bool {
        matches!(self, Item::ConductionArea(..))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Item::Trace(..) => "trace",
            Item::Via(..) => "via",
            Item::Pin(..) => "pin",
            Item::ConductionArea(..) => "conduction area",
            Item::ObstacleArea(..) => "obstacle area",
            Item::ComponentOutline(..) => "component outline",
            Item::BoardOutline(..) => "board outline",
        }
    }
}

fn copper_is_obstacle_to(nets: &[usize], other: &Item) -> bool {
    match other {
        Item::ConductionArea(area) if !area.is_obstacle => false,
        Item::ComponentOutline(..) => false,
        _ => !other.shares_net(nets),
    }
}

fn is_trace_obstacle_for_nets(item_nets: &[usize], nets: &[usize]) -> bool {
    nets.is_empty() || !item_nets.iter().any(|net| nets.contains(net))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolylineTrace {
    polyline: Polyline,
    layer: usize,
    half_width: i64,
    nets: Vec<usize>,
    clearance_class: usize,
    fixed_state: FixedState,
}

impl PolylineTrace {
    pub fn new(
        polyline: Polyline,
        layer: usize,
        half_width: i64,
        nets: Vec<usize>,
        clearance_class: usize,
        fixed_state: FixedState,
    ) -> Self {
        if polyline.line_count() < 3 {
            log::warn!("trace polyline with {} lines", polyline.line_count());
        }

        Self {
            polyline,
            layer,
            half_width,
            nets,
            clearance_class,
            fixed_state,
        }
    }

    pub fn polyline(&self) -> &Polyline {
        &self.polyline
    }

    pub(crate) fn set_polyline(&mut self, polyline: Polyline) {
        self.polyline = polyline;
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn half_width(&self) -> i64 {
        self.half_width
    }

    pub fn first_corner(&self) -> Point {
        self.polyline.first_corner()
    }

    pub fn last_corner(&self) -> Point {
        self.polyline.last_corner()
    }

    pub fn corner_count(&self) -> usize {
        self.polyline.corner_count()
    }

    pub fn length(&self) -> f64 {
        self.polyline.length_approx()
    }

    pub fn nets_equal(&self, other: &PolylineTrace) -> bool {
        let mut nets = self.nets.clone();
        let mut other_nets = other.nets.clone();
        nets.sort_unstable();
        other_nets.sort_unstable();
        nets == other_nets
    }

    /// True if both ends lie on the same point.
    pub fn is_closed(&self) -> bool {
        !self.polyline.is_empty() && self.first_corner() == self.last_corner()
    }

    pub fn bounding_box(&self) -> IntBox {
        self.polyline
            .bounding_box()
            .enlarge(self.half_width as f64)
            .bounding_box()
    }
}

impl AccessItem for PolylineTrace {
    fn tile_shape_count(&self) -> usize {
        self.polyline.segment_count()
    }

    fn tile_shape(&self, index: usize) -> Option<TileShape> {
        self.polyline.offset_shape(self.half_width as f64, index)
    }

    fn offset_tile_shape(&self, index: usize, offset: f64) -> Option<TileShape> {
        self.polyline
            .offset_shape(self.half_width as f64 + offset, index)
    }

    fn shape_layer(&self, _index: usize) -> usize {
        self.layer
    }

    fn is_obstacle(&self, other: &Item) -> bool {
        copper_is_obstacle_to(&self.nets, other)
    }

    fn is_trace_obstacle(&self, nets: &[usize]) -> bool {
        is_trace_obstacle_for_nets(&self.nets, nets)
    }

    fn clearance_class(&self) -> usize {
        self.clearance_class
    }

    fn nets(&self) -> &[usize] {
        &self.nets
    }

    fn fixed_state(&self) -> FixedState {
        self.fixed_state
    }
}

macro_rules! impl_drill_item {
    ($drill_struct:ident) => {
        impl $drill_struct {
            pub fn center(&self) -> IntPoint {
                self.center
            }

            pub fn first_layer(&self) -> usize {
                self.first_layer
            }

            pub fn last_layer(&self) -> usize {
                self.last_layer
            }

            pub(crate) fn set_center(&mut self, center: IntPoint) {
                self.center = center;
            }
        }

        impl AccessItem for $drill_struct {
            fn tile_shape_count(&self) -> usize {
                self.last_layer.saturating_sub(self.first_layer) + 1
            }

            fn tile_shape(&self, index: usize) -> Option<TileShape> {
                (index < self.tile_shape_count()).then(|| self.pad_shape())
            }

            fn shape_layer(&self, index: usize) -> usize {
                self.first_layer + index
            }

            fn is_obstacle(&self, other: &Item) -> bool {
                self.is_obstacle_to(other)
            }

            fn is_trace_obstacle(&self, nets: &[usize]) -> bool {
                is_trace_obstacle_for_nets(&self.nets, nets)
            }

            fn clearance_class(&self) -> usize {
                self.clearance_class
            }

            fn nets(&self) -> &[usize] {
                &self.nets
            }

            fn fixed_state(&self) -> FixedState {
                self.fixed_state
            }
        }
    };
}

/// Plated hole connecting a range of layers, with an octagonal pad
/// circumscribing a circle of `radius`.
#[derive(Debug, Clone, PartialEq)]
pub struct Via {
    center: IntPoint,
    first_layer: usize,
    last_layer: usize,
    radius: i64,
    nets: Vec<usize>,
    clearance_class: usize,
    fixed_state: FixedState,
}

impl Via {
    pub fn new(
        center: IntPoint,
        first_layer: usize,
        last_layer: usize,
        radius: i64,
        nets: Vec<usize>,
        clearance_class: usize,
        fixed_state: FixedState,
    ) -> Self {
        Self {
            center,
            first_layer: first_layer.min(last_layer),
            last_layer: first_layer.max(last_layer),
            radius,
            nets,
            clearance_class,
            fixed_state,
        }
    }

    pub fn radius(&self) -> i64 {
        self.radius
    }

    fn pad_shape(&self) -> TileShape {
        let IntPoint { x, y } = self.center;
        let r = self.radius;
        let diagonal = math::ceil_to_i64(r as f64 * SQRT2);
        TileShape::Octagon(IntOctagon::new(
            x - r,
            y - r,
            x + r,
            y + r,
            x - y - diagonal,
            x - y + diagonal,
            x + y - diagonal,
            x + y + diagonal,
        ))
    }

    fn is_obstacle_to(&self, other: &Item) -> bool {
        copper_is_obstacle_to(&self.nets, other)
    }
}

impl_drill_item!(Via);

/// Component pin with a rectangular pad.
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    center: IntPoint,
    first_layer: usize,
    last_layer: usize,
    pad_half_width: i64,
    pad_half_height: i64,
    nets: Vec<usize>,
    clearance_class: usize,
    fixed_state: FixedState,
}

impl Pin {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        center: IntPoint,
        first_layer: usize,
        last_layer: usize,
        pad_half_width: i64,
        pad_half_height: i64,
        nets: Vec<usize>,
        clearance_class: usize,
    ) -> Self {
        Self {
            center,
            first_layer: first_layer.min(last_layer),
            last_layer: first_layer.max(last_layer),
            pad_half_width,
            pad_half_height,
            nets,
            clearance_class,
            fixed_state: FixedState::SystemFixed,
        }
    }

    pub fn pad_half_width(&self) -> i64 {
        self.pad_half_width
    }

    pub fn pad_half_height(&self) -> i64 {
        self.pad_half_height
    }

    fn pad_shape(&self) -> TileShape {
        let IntPoint { x, y } = self.center;
        TileShape::Box(IntBox::new(
            x - self.pad_half_width,
            y - self.pad_half_height,
            x + self.pad_half_width,
            y + self.pad_half_height,
        ))
    }

    fn is_obstacle_to(&self, other: &Item) -> bool {
        match other {
            Item::ObstacleArea(..) => false,
            _ if !other.shares_net(&self.nets) => true,
            Item::Trace(..) => false,
            _ => other.is_drill_item(),
        }
    }
}

impl_drill_item!(Pin);

/// Convex decomposition of a simple polygon given by its corners.
fn polygon_tiles(corners: &[IntPoint]) -> Vec<TileShape> {
    if corners.len() < 3 {
        log::warn!("area polygon with {} corners", corners.len());
        return vec![];
    }

    if is_convex(corners) {
        return vec![TileShape::Simplex(Simplex::from_corners(corners))];
    }

    let mut cdt = ConstrainedDelaunayTriangulation::<Point2<f64>>::new();
    let mut handles = Vec::with_capacity(corners.len());

    for corner in corners {
        match cdt.insert(Point2::new(corner.x as f64, corner.y as f64)) {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                log::warn!("could not triangulate area corner {:?}: {:?}", corner, err);
                return vec![];
            }
        }
    }

    for i in 0..handles.len() {
        let (from, to) = (handles[i], handles[(i + 1) % handles.len()]);

        if from != to {
            cdt.add_constraint(from, to);
        }
    }

    let polygon = Polygon::new(
        LineString::from(
            corners
                .iter()
                .map(|p| (p.x as f64, p.y as f64))
                .collect::<Vec<_>>(),
        ),
        vec![],
    );

    cdt.inner_faces()
        .filter_map(|face| {
            let triangle: Vec<IntPoint> = face
                .vertices()
                .iter()
                .map(|v| {
                    let position = v.position();
                    IntPoint::round(FloatPoint::new(position.x, position.y))
                })
                .collect();
            let outline = Polygon::new(
                LineString::from(
                    triangle
                        .iter()
                        .map(|p| (p.x as f64, p.y as f64))
                        .collect::<Vec<_>>(),
                ),
                vec![],
            );
            let centroid = outline.centroid()?;
            polygon
                .contains(&centroid)
                .then(|| TileShape::Simplex(Simplex::from_corners(&triangle)))
        })
        .collect()
}

fn is_convex(corners: &[IntPoint]) -> bool {
    let n = corners.len();
    let mut turn = 0i128;

    for i in 0..n {
        let a = corners[i];
        let b = corners[(i + 1) % n];
        let c = corners[(i + 2) % n];
        let cross = b.difference_by(a).cross(c.difference_by(b));

        if cross != 0 {
            if turn != 0 && cross.signum() != turn {
                return false;
            }

            turn = cross.signum();
        }
    }

    true
}

macro_rules! impl_area_item {
    ($area_struct:ident) => {
        impl $area_struct {
            pub fn corners(&self) -> &[IntPoint] {
                &self.corners
            }

            pub fn layer(&self) -> usize {
                self.layer
            }

            /// Closed containment in the area polygon.
            pub fn contains(&self, p: &Point) -> bool {
                self.tiles.iter().any(|tile| tile.contains(p))
            }
        }

        impl AccessItem for $area_struct {
            fn tile_shape_count(&self) -> usize {
                self.tiles.len()
            }

            fn tile_shape(&self, index: usize) -> Option<TileShape> {
                self.tiles.get(index).cloned()
            }

            fn shape_layer(&self, _index: usize) -> usize {
                self.layer
            }

            fn is_obstacle(&self, other: &Item) -> bool {
                self.is_obstacle_to(other)
            }

            fn is_trace_obstacle(&self, nets: &[usize]) -> bool {
                self.is_trace_obstacle_for(nets)
            }

            fn clearance_class(&self) -> usize {
                self.clearance_class
            }

            fn nets(&self) -> &[usize] {
                &self.nets
            }

            fn fixed_state(&self) -> FixedState {
                self.fixed_state
            }
        }
    };
}

/// Copper plane or pour. Areas that are not obstacles only provide
/// connectivity.
#[derive(Debug, Clone, PartialEq)]
pub struct ConductionArea {
    corners: Vec<IntPoint>,
    tiles: Vec<TileShape>,
    layer: usize,
    nets: Vec<usize>,
    clearance_class: usize,
    is_obstacle: bool,
    fixed_state: FixedState,
}

impl ConductionArea {
    pub fn new(
        corners: Vec<IntPoint>,
        layer: usize,
        nets: Vec<usize>,
        clearance_class: usize,
        is_obstacle: bool,
    ) -> Self {
        Self {
            tiles: polygon_tiles(&corners),
            corners,
            layer,
            nets,
            clearance_class,
            is_obstacle,
            fixed_state: FixedState::UserFixed,
        }
    }

    pub fn get_is_obstacle(&self) -> bool {
        self.is_obstacle
    }

    fn is_obstacle_to(&self, other: &Item) -> bool {
        self.is_obstacle && copper_is_obstacle_to(&self.nets, other)
    }

    fn is_trace_obstacle_for(&self, nets: &[usize]) -> bool {
        self.is_obstacle && is_trace_obstacle_for_nets(&self.nets, nets)
    }
}

impl_area_item!(ConductionArea);

/// Keepout area for traces and vias.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleArea {
    corners: Vec<IntPoint>,
    tiles: Vec<TileShape>,
    layer: usize,
    nets: Vec<usize>,
    clearance_class: usize,
    fixed_state: FixedState,
}

impl ObstacleArea {
    pub fn new(corners: Vec<IntPoint>, layer: usize, nets: Vec<usize>, clearance_class: usize) -> Self {
        Self {
            tiles: polygon_tiles(&corners),
            corners,
            layer,
            nets,
            clearance_class,
            fixed_state: FixedState::SystemFixed,
        }
    }

    fn is_obstacle_to(&self, other: &Item) -> bool {
        !other.shares_net(&self.nets) && matches!(other, Item::Trace(..) | Item::Via(..))
    }

    fn is_trace_obstacle_for(&self, nets: &[usize]) -> bool {
        is_trace_obstacle_for_nets(&self.nets, nets)
    }
}

impl_area_item!(ObstacleArea);

/// Placement outline of a component. It has no tree shapes and never
/// obstructs anything.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentOutline {
    corners: Vec<IntPoint>,
    layer: usize,
}

impl ComponentOutline {
    pub fn new(corners: Vec<IntPoint>, layer: usize) -> Self {
        Self { corners, layer }
    }

    pub fn corners(&self) -> &[IntPoint] {
        &self.corners
    }

    pub fn layer(&self) -> usize {
        self.layer
    }
}

impl AccessItem for ComponentOutline {
    fn tile_shape_count(&self) -> usize {
        0
    }

    fn tile_shape(&self, _index: usize) -> Option<TileShape> {
        None
    }

    fn shape_layer(&self, _index: usize) -> usize {
        self.layer
    }

    fn is_obstacle(&self, _other: &Item) -> bool {
        false
    }

    fn is_trace_obstacle(&self, _nets: &[usize]) -> bool {
        false
    }

    fn clearance_class(&self) -> usize {
        0
    }

    fn nets(&self) -> &[usize] {
        &[]
    }

    fn fixed_state(&self) -> FixedState {
        FixedState::SystemFixed
    }
}

/// Edge of the routable region, stored as thin shapes along each outline
/// edge on every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardOutline {
    corners: Vec<IntPoint>,
    edges: Vec<TileShape>,
    layer_count: usize,
    clearance_class: usize,
}

impl BoardOutline {
    pub const HALF_WIDTH: i64 = 100;

    pub fn new(corners: Vec<IntPoint>, layer_count: usize, clearance_class: usize) -> Self {
        let n = corners.len();
        let edges = (0..n)
            .filter_map(|i| {
                Polyline::from_corners(&[corners[i], corners[(i + 1) % n]])
                    .offset_shape(Self::HALF_WIDTH as f64, 0)
            })
            .collect();

        Self {
            corners,
            edges,
            layer_count: layer_count.max(1),
            clearance_class,
        }
    }

    pub fn corners(&self) -> &[IntPoint] {
        &self.corners
    }

    pub fn bounding_box(&self) -> IntBox {
        IntBox::bounding_float(self.corners.iter().map(|p| p.to_float()))
    }
}

impl AccessItem for BoardOutline {
    fn tile_shape_count(&self) -> usize {
        self.edges.len() * self.layer_count
    }

    fn tile_shape(&self, index: usize) -> Option<TileShape> {
        if self.edges.is_empty() {
            return None;
        }

        (index < self.tile_shape_count()).then(|| self.edges[index % self.edges.len()].clone())
    }

    fn shape_layer(&self, index: usize) -> usize {
        index / self.edges.len().max(1)
    }

    fn is_obstacle(&self, other: &Item) -> bool {
        !matches!(other, Item::BoardOutline(..) | Item::ObstacleArea(..))
    }

    fn is_trace_obstacle(&self, _nets: &[usize]) -> bool {
        true
    }

    fn clearance_class(&self) -> usize {
        self.clearance_class
    }

    fn nets(&self) -> &[usize] {
        &[]
    }

    fn fixed_state(&self) -> FixedState {
        FixedState::SystemFixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    #[test]
    fn trace_shapes_follow_segments() {
        let trace = PolylineTrace::new(
            Polyline::from_corners(&[p(0, 0), p(1000, 0), p(1000, 1000)]),
            0,
            50,
            vec![1],
            1,
            FixedState::Unfixed,
        );
        assert_eq!(trace.tile_shape_count(), 2);
        assert!(trace.tile_shape(1).unwrap().contains_int(p(1000, 500)));
        assert!(trace.tile_shape(2).is_none());
        assert!(!trace.is_trace_obstacle(&[1]));
        assert!(trace.is_trace_obstacle(&[2]));
    }

    #[test]
    fn via_has_one_shape_per_layer() {
        let via = Via::new(p(0, 0), 2, 0, 100, vec![1], 1, FixedState::Unfixed);
        assert_eq!(via.tile_shape_count(), 3);
        assert_eq!(via.shape_layer(2), 2);
        let pad = via.tile_shape(0).unwrap();
        assert!(pad.contains_int(p(100, 0)));
        assert!(!pad.contains_int(p(100, 100)));
    }

    #[test]
    fn non_convex_area_is_triangulated() {
        let area = ConductionArea::new(
            vec![p(0, 0), p(1000, 0), p(1000, 1000), p(500, 400), p(0, 1000)],
            0,
            vec![1],
            1,
            false,
        );
        assert!(area.tile_shape_count() >= 3);
        assert!(area.contains(&Point::Int(p(100, 100))));
        assert!(!area.contains(&Point::Int(p(500, 900))));
        assert!(!area.is_trace_obstacle(&[2]));
    }

    #[test]
    fn board_outline_covers_every_layer() {
        let outline = BoardOutline::new(
            vec![p(0, 0), p(10_000, 0), p(10_000, 10_000), p(0, 10_000)],
            2,
            1,
        );
        assert_eq!(outline.tile_shape_count(), 8);
        assert_eq!(outline.shape_layer(5), 1);
        assert_eq!(outline.bounding_box(), IntBox::new(0, 0, 10_000, 10_000));
    }
}
