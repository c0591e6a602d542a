//! Map rendering entry point.
//!
//! [`MapRenderer::render`] walks layers, styles, features, rules and
//! symbolizers strictly in input order. Every feature goes through its
//! own transform chain; placed labels and markers share one collision
//! detector per render, so earlier features win. Configuration problems
//! are found before anything is drawn; labels that do not fit are dropped
//! silently.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::RasterBackend;
use crate::basics::{PointD, RectD};
use crate::color::Rgba8;
use crate::errors::{Error, Result};
use crate::expression::Expression;
use crate::feature::{Feature, FeatureSource};
use crate::font::FontFaceCache;
use crate::group_layout::GroupPlacementFinder;
use crate::label_collision_detector::LabelCollisionDetector;
use crate::marker_cache::MarkerCache;
use crate::markers_placement::{MarkerInstance, MarkersPlacementFinder};
use crate::path_storage::PathStorage;
use crate::placement_finder::{GlyphPositions, PlacementFinder};
use crate::projection::{ProjTransform, ProjTransformCache, Projection};
use crate::render_thunk::RenderThunkExtractor;
use crate::symbolizer::{point_marker_properties, GroupSymbolizer, Symbolizer, TextSymbolizer};
use crate::text_layout::TextLayout;
use crate::trans_view::ViewTransform;
use crate::transform_chain::TransformChain;

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Rules with a filter apply only to features where it evaluates to
    /// non-empty text.
    pub filter: Option<Expression>,
    pub symbolizers: Vec<Symbolizer>,
}

impl Rule {
    pub fn new(symbolizers: Vec<Symbolizer>) -> Self {
        Self {
            filter: None,
            symbolizers,
        }
    }

    pub fn with_filter(mut self, filter: Expression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |f| !f.evaluate(feature).is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub rules: Vec<Rule>,
}

impl Style {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub srs: String,
    /// Key into the [`Datasources`] passed to the renderer.
    pub datasource: String,
    /// Style names, drawn in order.
    pub styles: Vec<String>,
}

impl Layer {
    pub fn new(name: &str, srs: &str, datasource: &str) -> Self {
        Self {
            name: name.to_string(),
            srs: srs.to_string(),
            datasource: datasource.to_string(),
            styles: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.styles.push(style.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    pub width: u32,
    pub height: u32,
    pub srs: String,
    /// Visible area in the map CRS.
    pub extent: RectD,
    /// Extra pixels around the image where features are still read and
    /// labels may still land.
    pub buffer_size: f64,
    pub scale_factor: f64,
    pub background: Option<Rgba8>,
    pub layers: Vec<Layer>,
    pub styles: BTreeMap<String, Style>,
}

impl Map {
    pub fn new(width: u32, height: u32, srs: &str, extent: RectD) -> Self {
        Self {
            width,
            height,
            srs: srs.to_string(),
            extent,
            buffer_size: 0.0,
            scale_factor: 1.0,
            background: None,
            layers: Vec::new(),
            styles: BTreeMap::new(),
        }
    }

    pub fn add_style(&mut self, name: &str, style: Style) {
        self.styles.insert(name.to_string(), style);
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Image rectangle in device pixels.
    pub fn dims(&self) -> RectD {
        RectD::new(0.0, 0.0, self.width as f64, self.height as f64)
    }
}

/// Named feature sources for one render.
#[derive(Default)]
pub struct Datasources<'s> {
    sources: BTreeMap<String, &'s dyn FeatureSource>,
}

impl<'s> Datasources<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, source: &'s dyn FeatureSource) {
        self.sources.insert(name.to_string(), source);
    }

    pub fn get(&self, name: &str) -> Option<&'s dyn FeatureSource> {
        self.sources.get(name).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementKind {
    Text { text: String, positions: GlyphPositions },
    Marker(MarkerInstance),
    /// Member boxes of a placed group.
    Group(Vec<RectD>),
}

/// One label, marker or group that made it onto the map.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedPlacement {
    pub layer: String,
    pub feature_id: u64,
    pub symbolizer: &'static str,
    pub kind: PlacementKind,
}

impl AcceptedPlacement {
    pub fn bbox(&self) -> RectD {
        match &self.kind {
            PlacementKind::Text { positions, .. } => positions.bbox(),
            PlacementKind::Marker(m) => m.bbox,
            PlacementKind::Group(boxes) => {
                let mut r = RectD::invalid();
                for b in boxes {
                    r.expand_to_include_rect(b);
                }
                r
            }
        }
    }
}

/// What one layer needs, resolved up front.
struct LayerPlan<'m, 's> {
    layer: &'m Layer,
    source: &'s dyn FeatureSource,
    proj: Arc<ProjTransform>,
}

/// Per-render state.
struct Frame<'m> {
    view: ViewTransform,
    dims: RectD,
    scale_factor: f64,
    layer: &'m str,
    detector: LabelCollisionDetector,
    placements: Vec<AcceptedPlacement>,
}

impl Frame<'_> {
    fn accept(&mut self, feature: &Feature, symbolizer: &Symbolizer, kind: PlacementKind) {
        self.placements.push(AcceptedPlacement {
            layer: self.layer.to_string(),
            feature_id: feature.id(),
            symbolizer: symbolizer.name(),
            kind,
        });
    }
}

/// Renders maps onto a backend. The caches are shared, long-lived and
/// passed in; everything else lives for one [`render`](Self::render).
pub struct MapRenderer<'c, B: RasterBackend> {
    backend: B,
    projections: &'c ProjTransformCache,
    fonts: &'c FontFaceCache,
    markers: &'c MarkerCache,
}

impl<'c, B: RasterBackend> MapRenderer<'c, B> {
    pub fn new(
        backend: B,
        projections: &'c ProjTransformCache,
        fonts: &'c FontFaceCache,
        markers: &'c MarkerCache,
    ) -> Self {
        Self {
            backend,
            projections,
            fonts,
            markers,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Draw `map` and return every accepted label, marker and group in
    /// placement order.
    pub fn render(
        &mut self,
        map: &Map,
        sources: &Datasources<'_>,
    ) -> Result<Vec<AcceptedPlacement>> {
        let plans = self.validate(map, sources)?;

        let sf = map.scale_factor;
        let dims = map.dims();
        let buffered = dims.padded(map.buffer_size * sf);
        let view = ViewTransform::new(map.width, map.height, map.extent);
        let query_box = view.backward_box(&buffered);
        let mut frame = Frame {
            view,
            dims,
            scale_factor: sf,
            layer: "",
            detector: LabelCollisionDetector::new(buffered),
            placements: Vec::new(),
        };

        if let Some(color) = map.background {
            let mut path = PathStorage::new();
            path.move_to(dims.x1, dims.y1);
            path.line_to(dims.x2, dims.y1);
            path.line_to(dims.x2, dims.y2);
            path.line_to(dims.x1, dims.y2);
            path.close_polygon();
            self.backend.fill_path(&mut path, color)?;
        }

        for plan in &plans {
            let layer = plan.layer;
            frame.layer = &layer.name;
            if plan.proj.equal() {
                debug!(
                    layer = layer.name.as_str(),
                    srs = layer.srs.as_str(),
                    "identical projections, no reprojection"
                );
            }
            // map -> layer
            let Some(layer_box) = plan.proj.forward_box(&query_box) else {
                debug!(layer = layer.name.as_str(), "query box outside layer projection domain");
                continue;
            };
            let placed_before = frame.placements.len();
            let mut features = 0usize;
            for style_name in &layer.styles {
                let Some(style) = map.styles.get(style_name) else {
                    warn!(
                        layer = layer.name.as_str(),
                        style = style_name.as_str(),
                        "unknown style"
                    );
                    continue;
                };
                for feature in plan.source.features(&layer_box) {
                    features += 1;
                    for rule in style.rules.iter().filter(|r| r.matches(feature)) {
                        for symbolizer in &rule.symbolizers {
                            self.render_symbolizer(
                                &mut frame,
                                &plan.proj,
                                layer_box,
                                feature,
                                symbolizer,
                            )?;
                        }
                    }
                }
            }
            debug!(
                layer = layer.name.as_str(),
                features,
                placements = frame.placements.len() - placed_before,
                "layer rendered"
            );
        }
        Ok(frame.placements)
    }

    /// Resolve projections, datasources and markers before drawing.
    fn validate<'m, 's>(
        &self,
        map: &'m Map,
        sources: &Datasources<'s>,
    ) -> Result<Vec<LayerPlan<'m, 's>>> {
        if map.width == 0 || map.height == 0 {
            return Err(Error::InvalidMap {
                message: format!("image size {}x{}", map.width, map.height),
            });
        }
        if !map.extent.is_valid() || map.extent.width() <= 0.0 || map.extent.height() <= 0.0 {
            return Err(Error::InvalidMap {
                message: "empty extent".to_string(),
            });
        }
        if !(map.scale_factor > 0.0) {
            return Err(Error::InvalidMap {
                message: format!("scale factor {}", map.scale_factor),
            });
        }
        Projection::parse(&map.srs)?;

        let mut plans = Vec::with_capacity(map.layers.len());
        for layer in &map.layers {
            let proj = self.projections.get(&map.srs, &layer.srs)?;
            let source = sources.get(&layer.datasource).ok_or_else(|| Error::UnknownDatasource {
                layer: layer.name.clone(),
                name: layer.datasource.clone(),
            })?;
            for style in layer.styles.iter().filter_map(|s| map.styles.get(s)) {
                for symbolizer in style.rules.iter().flat_map(|r| &r.symbolizers) {
                    for uri in symbolizer.marker_files() {
                        self.markers.load(uri)?;
                    }
                }
            }
            plans.push(LayerPlan { layer, source, proj });
        }
        Ok(plans)
    }

    fn render_symbolizer(
        &mut self,
        frame: &mut Frame<'_>,
        proj: &ProjTransform,
        layer_box: RectD,
        feature: &Feature,
        symbolizer: &Symbolizer,
    ) -> Result<()> {
        let sf = frame.scale_factor;
        let options = symbolizer.transform_options(layer_box);
        let view = frame.view;
        let chain = TransformChain::new(feature.geometry(), proj, &view, &options);

        match symbolizer {
            Symbolizer::Polygon(p) => {
                let mut path = chain.build();
                self.backend.fill_path(&mut path, p.fill.with_opacity(p.opacity))?;
            }
            Symbolizer::Line(l) => {
                let mut path = chain.build();
                self.backend
                    .stroke_path(&mut path, l.stroke.with_opacity(l.opacity), l.width * sf)?;
            }
            Symbolizer::Point(p) => {
                let marker = self.markers.load(&p.file)?;
                let props = point_marker_properties(p);
                let bbox = marker.scaled_bbox(sf);
                let mut finder = MarkersPlacementFinder::new(&mut frame.detector, bbox, &props, sf)
                    .with_dims(frame.dims);
                finder.find_placements(&chain);
                for m in finder.into_placements() {
                    self.backend.draw_marker(&marker, m.pos, m.angle, sf, p.opacity)?;
                    frame.accept(feature, symbolizer, PlacementKind::Marker(m));
                }
            }
            Symbolizer::Markers(s) => {
                let marker = self.markers.load(&s.file)?;
                let fill = s.fill.with_opacity(s.opacity);
                let bbox = marker.scaled_bbox(sf);
                let mut finder =
                    MarkersPlacementFinder::new(&mut frame.detector, bbox, &s.placement, sf)
                        .with_dims(frame.dims);
                finder.find_placements(&chain);
                for m in finder.into_placements() {
                    let mut path = marker.placed_path(m.pos, m.angle, sf);
                    self.backend.fill_path(&mut path, fill)?;
                    frame.accept(feature, symbolizer, PlacementKind::Marker(m));
                }
            }
            Symbolizer::Text(t) => self.render_text(frame, &chain, feature, symbolizer, t)?,
            Symbolizer::Group(g) => self.render_group(frame, &chain, feature, symbolizer, g)?,
        }
        Ok(())
    }

    fn render_text(
        &mut self,
        frame: &mut Frame<'_>,
        chain: &TransformChain<'_>,
        feature: &Feature,
        symbolizer: &Symbolizer,
        t: &TextSymbolizer,
    ) -> Result<()> {
        let sf = frame.scale_factor;
        let text = t.name.evaluate(feature);
        if text.is_empty() {
            return Ok(());
        }
        let shield = t.shield.as_deref().map(|uri| self.markers.load(uri)).transpose()?;
        let format = Arc::new(t.format.clone());
        let face = self.fonts.get_or_monospace(&format.face_name);
        let layout = TextLayout::new(&text, Arc::clone(&format), face, &t.placement, sf);

        let mut finder = PlacementFinder::new(&mut frame.detector, &layout, &t.placement, sf)
            .with_dims(frame.dims);
        if let Some(marker) = &shield {
            finder.set_marker(marker.scaled_bbox(sf));
        }
        if !finder.find_placements(chain) {
            debug!(feature = feature.id(), text = text.as_str(), "label dropped");
        }
        for positions in finder.into_placements() {
            if let (Some(marker), Some(m)) = (&shield, &positions.marker) {
                self.backend.draw_marker(marker, m.pos, 0.0, sf, format.opacity)?;
            }
            self.backend.draw_glyphs(&positions, &format)?;
            frame.accept(
                feature,
                symbolizer,
                PlacementKind::Text {
                    text: text.clone(),
                    positions,
                },
            );
        }
        Ok(())
    }

    fn render_group(
        &mut self,
        frame: &mut Frame<'_>,
        chain: &TransformChain<'_>,
        feature: &Feature,
        symbolizer: &Symbolizer,
        g: &GroupSymbolizer,
    ) -> Result<()> {
        let sf = frame.scale_factor;
        let extractor = RenderThunkExtractor::new(self.fonts, self.markers, sf);
        let mut members = Vec::with_capacity(g.members.len());
        for member in &g.members {
            if let Some(m) = extractor.extract(member, feature)? {
                members.push(m);
            }
        }
        if members.is_empty() {
            return Ok(());
        }

        let member_boxes: Vec<RectD> = members.iter().map(|m| m.bbox()).collect();
        let offsets = g.layout.offsets(&member_boxes, sf);
        let boxes: Vec<RectD> = members
            .iter()
            .zip(&offsets)
            .flat_map(|(m, o)| m.boxes.iter().map(move |b| b.translated(o.x, o.y)))
            .collect();
        let key = g
            .repeat_key
            .as_ref()
            .map(|e| e.evaluate(feature))
            .unwrap_or_default();

        let mut finder =
            GroupPlacementFinder::new(&mut frame.detector, &boxes, &g.placement, sf, &key)
                .with_dims(frame.dims);
        if !finder.find_placements(chain) {
            debug!(feature = feature.id(), "group dropped");
        }
        for anchor in finder.into_anchors() {
            for (member, o) in members.iter().zip(&offsets) {
                let at = anchor + *o;
                member.thunk.translated(at.x, at.y).render(&mut self.backend)?;
            }
            let placed = boxes
                .iter()
                .map(|b| b.translated(anchor.x, anchor.y))
                .collect();
            frame.accept(feature, symbolizer, PlacementKind::Group(placed));
        }
        Ok(())
    }
}

/// Device position of a world point in `map`, for callers checking where a
/// feature lands.
pub fn world_to_device(map: &Map, p: PointD) -> PointD {
    let view = ViewTransform::new(map.width, map.height, map.extent);
    let (mut x, mut y) = (p.x, p.y);
    view.forward(&mut x, &mut y);
    PointD::new(x, y)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DrawOp, RecordingBackend};
    use crate::feature::MemoryFeatureSource;
    use crate::geometry::{Geometry, Point};
    use crate::symbolizer::{LineSymbolizer, PointSymbolizer};

    fn map_with(style: Style) -> Map {
        let mut map = Map::new(100, 100, "epsg:3857", RectD::new(0.0, 0.0, 100.0, 100.0));
        map.add_style("s", style);
        map.add_layer(Layer::new("l", "epsg:3857", "d").with_style("s"));
        map
    }

    fn caches() -> (ProjTransformCache, FontFaceCache, MarkerCache) {
        (ProjTransformCache::new(), FontFaceCache::new(), MarkerCache::new())
    }

    #[test]
    fn test_config_errors_before_drawing() {
        let (p, f, m) = caches();
        let source = MemoryFeatureSource::new();
        let mut sources = Datasources::new();
        sources.insert("d", &source);

        let mut map = map_with(Style::default());
        map.background = Some(Rgba8::WHITE);
        map.srs = "+proj=unknown".to_string();
        let mut r = MapRenderer::new(RecordingBackend::new(), &p, &f, &m);
        assert!(matches!(r.render(&map, &sources), Err(Error::InvalidProjection { .. })));
        assert!(r.backend().ops().is_empty());

        let map = map_with(Style::new(vec![Rule::new(vec![Symbolizer::Point(PointSymbolizer {
            file: "/nonexistent/marker.txt".to_string(),
            ..PointSymbolizer::default()
        })])]));
        assert!(matches!(r.render(&map, &sources), Err(Error::MarkerFile { .. })));

        let map = map_with(Style::default());
        let empty = Datasources::new();
        assert!(matches!(r.render(&map, &empty), Err(Error::UnknownDatasource { .. })));
        assert!(r.backend().ops().is_empty());
    }

    #[test]
    fn test_points_collide_in_feature_order() {
        let (p, f, m) = caches();
        let source: MemoryFeatureSource = vec![
            Feature::new(1, Geometry::Point(Point::new(50.0, 50.0))),
            Feature::new(2, Geometry::Point(Point::new(53.0, 50.0))),
            Feature::new(3, Geometry::Point(Point::new(80.0, 50.0))),
        ]
        .into_iter()
        .collect();
        let mut sources = Datasources::new();
        sources.insert("d", &source);
        let rule = Rule::new(vec![Symbolizer::Point(PointSymbolizer::default())]);
        let map = map_with(Style::new(vec![rule]));

        let mut r = MapRenderer::new(RecordingBackend::new(), &p, &f, &m);
        let placed = r.render(&map, &sources).unwrap();
        let ids: Vec<u64> = placed.iter().map(|p| p.feature_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(placed[0].bbox(), RectD::new(45.0, 45.0, 55.0, 55.0));
        assert_eq!(r.backend().ops().len(), 2);
    }

    #[test]
    fn test_rule_filter_and_line_stroke() {
        let (p, f, m) = caches();
        let source: MemoryFeatureSource = vec![
            Feature::new(
                1,
                Geometry::LineString(vec![Point::new(10.0, 10.0), Point::new(90.0, 10.0)]),
            )
            .with_attribute("highway", "primary"),
            Feature::new(
                2,
                Geometry::LineString(vec![Point::new(10.0, 20.0), Point::new(90.0, 20.0)]),
            ),
        ]
        .into_iter()
        .collect();
        let mut sources = Datasources::new();
        sources.insert("d", &source);
        let rule = Rule::new(vec![Symbolizer::Line(LineSymbolizer::default())])
            .with_filter(Expression::parse("[highway]").unwrap());
        let map = map_with(Style::new(vec![rule]));

        let mut r = MapRenderer::new(RecordingBackend::new(), &p, &f, &m);
        r.render(&map, &sources).unwrap();
        let ops = r.into_backend().into_ops();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            DrawOp::Stroke { vertices, .. } => {
                // y flips: world 10 is device row 90
                assert_eq!((vertices[0].x, vertices[0].y), (10.0, 90.0));
                assert_eq!((vertices[1].x, vertices[1].y), (90.0, 90.0));
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn test_world_to_device() {
        let map = Map::new(200, 100, "epsg:4326", RectD::new(-100.0, -50.0, 100.0, 50.0));
        assert_eq!(world_to_device(&map, PointD::new(0.0, 0.0)), PointD::new(100.0, 50.0));
        assert_eq!(world_to_device(&map, PointD::new(-100.0, 50.0)), PointD::new(0.0, 0.0));
    }
}
