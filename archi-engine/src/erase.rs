use std::f64::consts::TAU;

use archi_core::geometry::{Point2, Vector2, closest_point_on_segment, is_near_segment};
use archi_core::kind::{CapabilityTable, ErasePolicy, ShapeFamily, ShapeKind};
use archi_core::shape::{Drawing, Geometry, Shape, ShapeId};
use tracing::debug;

/// 橡皮擦参数，均为世界坐标。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraseParams {
    pub radius: f64,
    pub min_fragment_length: f64,
    /// 圆被擦除时去掉的楔形总角度（弧度）。
    pub wedge_angle: f64,
    pub arc_segments: usize,
    pub text_erase_width: f64,
}

impl Default for EraseParams {
    fn default() -> Self {
        Self {
            radius: 10.0,
            min_fragment_length: 10.0,
            wedge_angle: 45f64.to_radians(),
            arc_segments: 20,
            text_erase_width: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EraseOutcome {
    /// 橡皮擦未触及图元。
    Unaffected,
    /// 用零个或多个图元替换原图元。
    Replaced(Vec<Shape>),
}

impl EraseOutcome {
    #[inline]
    pub fn is_unaffected(&self) -> bool {
        matches!(self, EraseOutcome::Unaffected)
    }
}

/// 对单个图元施加一次局部擦除。碎片以世界坐标输出，旋转角为 0。
pub fn erase_partial(
    point: Point2,
    shape: &Shape,
    params: &EraseParams,
    capabilities: &CapabilityTable,
) -> EraseOutcome {
    match capabilities.erase_policy(shape.kind()) {
        ErasePolicy::Atomic => {
            if touches(point, shape, params) {
                EraseOutcome::Replaced(Vec::new())
            } else {
                EraseOutcome::Unaffected
            }
        }
        ErasePolicy::Split => match shape.world_segment() {
            Some((start, end)) => {
                match split_segment(point, params.radius, start, end, params.min_fragment_length) {
                    Some(pieces) => EraseOutcome::Replaced(
                        pieces
                            .into_iter()
                            .map(|(a, b)| fragment_of(shape, a, b))
                            .collect(),
                    ),
                    None => EraseOutcome::Unaffected,
                }
            }
            None => EraseOutcome::Unaffected,
        },
        ErasePolicy::Decompose => decompose_box(point, shape, params),
        ErasePolicy::ArcApproximation => erase_arc(point, shape, params),
    }
}

/// 线段擦除规则。未触及返回 None，否则返回保留下来的片段（可能为空）。
fn split_segment(
    point: Point2,
    radius: f64,
    start: Point2,
    end: Point2,
    min_length: f64,
) -> Option<Vec<(Point2, Point2)>> {
    if !is_near_segment(point, start, end, radius) {
        return None;
    }
    let length = start.distance(end);
    let Some(direction) = Vector2::from_points(start, end).normalize() else {
        return Some(Vec::new());
    };
    let closest = closest_point_on_segment(point, start, end);
    let retract = direction.scale(2.0 * radius);

    if closest.distance(start) <= radius {
        // 靠近起点：从起点收缩 2r。
        return Some(if length - 2.0 * radius > min_length {
            vec![(start.translate(retract), end)]
        } else {
            Vec::new()
        });
    }
    if closest.distance(end) <= radius {
        return Some(if length - 2.0 * radius > min_length {
            vec![(start, end.translate(retract.scale(-1.0)))]
        } else {
            Vec::new()
        });
    }

    let gap = direction.scale(radius);
    let head = (start, closest.translate(gap.scale(-1.0)));
    let tail = (closest.translate(gap), end);
    Some(
        [head, tail]
            .into_iter()
            .filter(|(a, b)| a.distance(*b) > min_length)
            .collect(),
    )
}

/// 线段族碎片保留原图元的种类与附加字段。
fn fragment_of(shape: &Shape, start: Point2, end: Point2) -> Shape {
    let mut fragment = shape.clone();
    fragment.geometry = Geometry::Span { start, end };
    fragment.rotation = 0.0;
    fragment
}

/// 矩形类：拆成上、右、下、左四条边逐一按线段规则处理。四边都未触及视为未受影响。
fn decompose_box(point: Point2, shape: &Shape, params: &EraseParams) -> EraseOutcome {
    let Some([nw, ne, se, sw]) = shape.world_corners() else {
        return EraseOutcome::Unaffected;
    };
    let mut touched = false;
    let mut pieces = Vec::new();
    for (a, b) in [(nw, ne), (ne, se), (se, sw), (sw, nw)] {
        match split_segment(point, params.radius, a, b, params.min_fragment_length) {
            Some(parts) => {
                touched = true;
                pieces.extend(parts);
            }
            None => pieces.push((a, b)),
        }
    }
    if !touched {
        return EraseOutcome::Unaffected;
    }
    EraseOutcome::Replaced(
        pieces
            .into_iter()
            .map(|(a, b)| Shape::segment(ShapeKind::Line, a, b, shape.style.clone()))
            .collect(),
    )
}

/// 圆：仅当擦除圆盘触及圆周时，去掉以擦除方向为中心的楔形，剩余圆弧用折线近似。
fn erase_arc(point: Point2, shape: &Shape, params: &EraseParams) -> EraseOutcome {
    let (center, radius) = match &shape.geometry {
        Geometry::Radial { center, radius } => (*center, *radius),
        _ => return EraseOutcome::Unaffected,
    };
    let offset = center.vector_to(point);
    if (offset.length() - radius).abs() > params.radius {
        return EraseOutcome::Unaffected;
    }

    let wedge = params.wedge_angle.clamp(0.0, TAU);
    let sweep = TAU - wedge;
    let start_angle = offset.y().atan2(offset.x()) + wedge * 0.5;
    let segments = params.arc_segments.max(1);
    let at = |index: usize| {
        let angle = start_angle + sweep * index as f64 / segments as f64;
        center.translate(Vector2::new(angle.cos(), angle.sin()).scale(radius))
    };
    let lines = (0..segments)
        .map(|index| Shape::segment(ShapeKind::Line, at(index), at(index + 1), shape.style.clone()))
        .collect();
    EraseOutcome::Replaced(lines)
}

/// 整体删除策略下的触及判定。
fn touches(point: Point2, shape: &Shape, params: &EraseParams) -> bool {
    let radius = params.radius;
    match shape.family() {
        ShapeFamily::Segment => shape
            .world_segment()
            .is_some_and(|(start, end)| is_near_segment(point, start, end, radius)),
        ShapeFamily::Area => shape.local_box().is_some_and(|(min, max)| {
            let local = shape.to_local(point);
            let clamped = Point2::new(
                local.x().clamp(min.x(), max.x()),
                local.y().clamp(min.y(), max.y()),
            );
            clamped.distance(local) <= radius
        }),
        ShapeFamily::Radial => shape
            .radius()
            .is_some_and(|r| shape.center().distance(point) <= r + radius),
        ShapeFamily::Canopy => shape
            .canopy()
            .is_some_and(|(center, r)| center.distance(point) <= r + radius),
        ShapeFamily::Anchor => {
            let anchor = shape.center();
            let font_size = shape.label.as_ref().map_or(0.0, |label| label.font_size);
            (point.x() - anchor.x()).abs() < params.text_erase_width + radius
                && (point.y() - anchor.y()).abs() < font_size + radius
        }
    }
}

/// 一次擦除采样的结果。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EraseReport {
    pub removed: Vec<ShapeId>,
    pub created: Vec<ShapeId>,
}

impl EraseReport {
    #[inline]
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// 对整个列表施加一次擦除采样。碎片占据原图元的层级位置，列表整体原子替换。
pub fn erase_at(
    drawing: &mut Drawing,
    point: Point2,
    params: &EraseParams,
    capabilities: &CapabilityTable,
) -> EraseReport {
    let mut report = EraseReport::default();
    let mut replacements = Vec::new();
    for (index, (id, shape)) in drawing.shapes().enumerate() {
        if let EraseOutcome::Replaced(fragments) = erase_partial(point, shape, params, capabilities) {
            replacements.push((index, *id, fragments));
        }
    }
    if replacements.is_empty() {
        return report;
    }

    let mut next = Vec::with_capacity(drawing.len() + replacements.len());
    let mut pending = replacements.into_iter().peekable();
    let existing: Vec<(ShapeId, Shape)> = drawing.shapes().cloned().collect();
    for (index, entry) in existing.into_iter().enumerate() {
        match pending.next_if(|(target, _, _)| *target == index) {
            Some((_, id, fragments)) => {
                report.removed.push(id);
                for fragment in fragments {
                    let new_id = drawing.allocate_id();
                    report.created.push(new_id);
                    next.push((new_id, fragment));
                }
            }
            None => next.push(entry),
        }
    }
    drawing.replace_shapes(next);
    debug!(
        removed = report.removed.len(),
        created = report.created.len(),
        x = point.x(),
        y = point.y(),
        "擦除采样"
    );
    report
}
