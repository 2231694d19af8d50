//! Campaign Grid Projector and the strategic map built on it.
//!
//! An axial grid of `cols × rows` hexes is a parallelogram on screen. The
//! projector scales it into a fixed canvas and then fills the canvas's
//! rectangular corners with padding hexes flagged as out of bounds.

pub mod tiles;

use std::collections::HashMap;

use bevy::log::{debug, warn};
use bevy::prelude::*;
use hexx::Hex;

use crate::battlefield::CampaignSettings;
use crate::coords::{self, HexKey};
use crate::scene::{NodeId, NodeRole, NodeSpec, RetainedScene, SceneGraph, Shape};

pub use tiles::{CampaignScenario, CampaignTile, CampaignTileKind, Force};

/// Lowest density the projector will produce.
pub const MIN_DENSITY: f32 = 0.05;
/// Highest density the projector will produce.
pub const MAX_DENSITY: f32 = 2.0;
/// Padding rings are never fewer than this.
pub const MIN_PADDING: i32 = 20;

/// Visual-state tag for hexes outside the official grid.
pub const OUT_OF_BOUNDS_TAG: &str = "out-of-bounds";

/// How a campaign grid maps onto a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CampaignProjection {
    /// Official columns.
    pub cols: i32,
    /// Official rows.
    pub rows: i32,
    /// Unscaled hex radius.
    pub hex_radius: f32,
    /// Canvas size.
    pub canvas: Vec2,
    /// Scale from unscaled pixels to canvas pixels.
    pub density: f32,
    /// Extra rings of hexes around the official grid.
    pub padding: i32,
    /// Unscaled bounding box of the official grid, hex extents included.
    pub bounds: Rect,
    /// Canvas position of the unscaled origin.
    pub offset: Vec2,
}

/// One hex picked for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleHex {
    /// Axial position.
    pub hex: Hex,
    /// Center in canvas pixels.
    pub center: Vec2,
    /// Inside the official `cols × rows` grid.
    pub official: bool,
}

impl CampaignProjection {
    /// Fits a `cols × rows` axial grid into a `canvas`-sized rectangle.
    pub fn compute(cols: i32, rows: i32, canvas: Vec2, hex_radius: f32) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let corners = [
            Hex::new(0, 0),
            Hex::new(cols - 1, 0),
            Hex::new(0, rows - 1),
            Hex::new(cols - 1, rows - 1),
        ];
        let mut bounds = Rect::from_center_size(coords::axial_to_pixel(corners[0], hex_radius), Vec2::ZERO);
        for corner in corners {
            bounds = bounds.union_point(coords::axial_to_pixel(corner, hex_radius));
        }
        // Flat-top extents: full radius sideways, half the short diagonal up and down.
        let extent = Vec2::new(hex_radius, hex_radius * 3f32.sqrt() / 2.0);
        let bounds = Rect::from_corners(bounds.min - extent, bounds.max + extent);

        let size = bounds.size();
        let raw = if size.x > 0.0 && size.y > 0.0 {
            (canvas.x / size.x).min(canvas.y / size.y)
        } else {
            1.0
        };
        let density = if raw.is_finite() {
            raw.clamp(MIN_DENSITY, MAX_DENSITY)
        } else {
            1.0
        };
        let padding = (cols / 3).max(rows / 3).max(MIN_PADDING);
        let offset = canvas / 2.0 - bounds.center() * density;

        Self {
            cols,
            rows,
            hex_radius,
            canvas,
            density,
            padding,
            bounds,
            offset,
        }
    }

    /// Scaled hex radius.
    pub fn scaled_radius(&self) -> f32 {
        self.hex_radius * self.density
    }

    /// Canvas position of a hex center.
    pub fn to_screen(&self, hex: Hex) -> Vec2 {
        coords::axial_to_pixel(hex, self.hex_radius) * self.density + self.offset
    }

    /// Hex under a canvas position.
    pub fn from_screen(&self, point: Vec2) -> Hex {
        coords::pixel_to_axial((point - self.offset) / self.density, self.hex_radius)
    }

    /// Whether a hex belongs to the official grid.
    pub fn is_official(&self, hex: Hex) -> bool {
        (0..self.cols).contains(&hex.x) && (0..self.rows).contains(&hex.y)
    }

    /// Every hex whose center lands on the canvas (plus a one-hex margin).
    ///
    /// Candidates span the official grid grown by the padding and by whatever
    /// range the canvas corners fall into, so the corners are always covered.
    pub fn visible_hexes(&self) -> Vec<VisibleHex> {
        let (mut q_min, mut q_max) = (-self.padding, self.cols - 1 + self.padding);
        let (mut r_min, mut r_max) = (-self.padding, self.rows - 1 + self.padding);
        for corner in [
            Vec2::ZERO,
            Vec2::new(self.canvas.x, 0.0),
            Vec2::new(0.0, self.canvas.y),
            self.canvas,
        ] {
            let hex = self.from_screen(corner);
            q_min = q_min.min(hex.x - 2);
            q_max = q_max.max(hex.x + 2);
            r_min = r_min.min(hex.y - 2);
            r_max = r_max.max(hex.y + 2);
        }

        let margin = self.scaled_radius();
        let area = Rect::from_corners(Vec2::splat(-margin), self.canvas + margin);
        let mut visible = Vec::new();
        for q in q_min..=q_max {
            for r in r_min..=r_max {
                let hex = Hex::new(q, r);
                let center = self.to_screen(hex);
                if area.contains(center) {
                    visible.push(VisibleHex {
                        hex,
                        center,
                        official: self.is_official(hex),
                    });
                }
            }
        }
        visible
    }
}

#[derive(Debug, Clone, Copy)]
struct CampaignCell {
    node: NodeId,
    center: Vec2,
}

type CampaignClickHandler = Box<dyn FnMut(HexKey, Option<&CampaignTile>) + Send + Sync>;

/// The strategic map: projected grid, installations and a single highlight.
pub struct CampaignMap {
    settings: CampaignSettings,
    scene: RetainedScene,
    projection: Option<CampaignProjection>,
    cells: HashMap<HexKey, CampaignCell>,
    tiles: HashMap<HexKey, CampaignTile>,
    highlight: Option<(HexKey, NodeId)>,
    on_click: Option<CampaignClickHandler>,
}

impl CampaignMap {
    /// Empty map.
    pub fn new(settings: CampaignSettings) -> Self {
        Self {
            settings,
            scene: RetainedScene::new(),
            projection: None,
            cells: HashMap::new(),
            tiles: HashMap::new(),
            highlight: None,
            on_click: None,
        }
    }

    /// Retained scene for drawing.
    pub fn scene(&self) -> &RetainedScene {
        &self.scene
    }

    /// Projection of the last render.
    pub fn projection(&self) -> Option<&CampaignProjection> {
        self.projection.as_ref()
    }

    /// Rebuilds the whole map.
    pub fn render(&mut self, scenario: &CampaignScenario) {
        self.scene = RetainedScene::new();
        self.cells.clear();
        self.highlight = None;
        self.tiles = scenario
            .tiles
            .iter()
            .map(|tile| (tile.key(), tile.clone()))
            .collect();

        let projection = CampaignProjection::compute(
            scenario.cols,
            scenario.rows,
            self.settings.canvas,
            self.settings.hex_radius,
        );
        let radius = projection.scaled_radius();
        let outline: Vec<Vec2> = coords::hex_polygon(Vec2::ZERO, radius).to_vec();
        let layer = self
            .scene
            .create(None, NodeSpec::new(NodeRole::Layer, Shape::Group));

        let visible = projection.visible_hexes();
        for hex in &visible {
            let key = HexKey::from_axial(hex.hex);
            let node = self.scene.create(
                Some(layer),
                NodeSpec::new(NodeRole::HexCell, Shape::Group)
                    .hex(key)
                    .at(hex.center),
            );
            let color = if hex.official {
                self.settings.land_color
            } else {
                self.settings.out_of_bounds_color
            };
            let polygon = self.scene.create(
                Some(node),
                NodeSpec::new(NodeRole::HexPolygon, Shape::Polygon(outline.clone()))
                    .hex(key)
                    .color(color),
            );
            self.scene.set_tag(polygon, OUT_OF_BOUNDS_TAG, !hex.official);

            if let Some(tile) = self.tiles.get(&key) {
                self.scene.create(
                    Some(node),
                    NodeSpec::new(NodeRole::UnitIcon, Shape::Circle { radius: radius * 0.55 })
                        .hex(key)
                        .color(tile.owner.color()),
                );
                self.scene.create(
                    Some(node),
                    NodeSpec::new(NodeRole::HexLabel, Shape::Label(tile.kind.marker().to_owned()))
                        .hex(key),
                );
            }

            self.cells.insert(
                key,
                CampaignCell {
                    node,
                    center: hex.center,
                },
            );
        }

        let missing = self
            .tiles
            .keys()
            .filter(|key| !self.cells.contains_key(key))
            .count();
        if missing > 0 {
            warn!(missing, "campaign tiles outside the rendered area");
        }
        debug!(
            hexes = visible.len(),
            density = projection.density,
            padding = projection.padding,
            "campaign map rendered"
        );
        self.projection = Some(projection);
    }

    /// Registers the hex click handler (replaces any previous one).
    pub fn on_hex_click(
        &mut self,
        handler: impl FnMut(HexKey, Option<&CampaignTile>) + Send + Sync + 'static,
    ) {
        self.on_click = Some(Box::new(handler));
    }

    /// Resolves a canvas click to a rendered hex and notifies the handler.
    pub fn handle_click(&mut self, point: Vec2) -> Option<HexKey> {
        let projection = self.projection?;
        let key = HexKey::from_axial(projection.from_screen(point));
        if !self.cells.contains_key(&key) {
            return None;
        }
        if let Some(handler) = self.on_click.as_mut() {
            handler(key, self.tiles.get(&key));
        }
        Some(key)
    }

    /// Installation on a hex.
    pub fn tile(&self, key: HexKey) -> Option<&CampaignTile> {
        self.tiles.get(&key)
    }

    /// Canvas center of a rendered hex.
    pub fn get_hex_center(&self, key: HexKey) -> Option<Vec2> {
        self.cells.get(&key).map(|c| c.center)
    }

    /// Outlines one hex, replacing any previous highlight.
    pub fn highlight_hex(&mut self, key: HexKey) -> bool {
        self.clear_highlight();
        let Some(cell) = self.cells.get(&key).copied() else {
            warn!(hex = %key, "cannot highlight unrendered campaign hex");
            return false;
        };
        let Some(projection) = self.projection else {
            return false;
        };
        let outline = coords::hex_polygon(Vec2::ZERO, projection.scaled_radius()).to_vec();
        let node = self.scene.create(
            Some(cell.node),
            NodeSpec::new(NodeRole::Highlight, Shape::Polygon(outline))
                .hex(key)
                .color(self.settings.highlight_color),
        );
        self.scene.set_tag(node, "highlight", true);
        self.highlight = Some((key, node));
        true
    }

    /// Removes the highlight, if any.
    pub fn clear_highlight(&mut self) {
        if let Some((_, node)) = self.highlight.take() {
            self.scene.remove(node);
        }
    }

    /// Currently highlighted hex.
    pub fn highlighted(&self) -> Option<HexKey> {
        self.highlight.map(|(key, _)| key)
    }
}
