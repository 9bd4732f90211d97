use archi_core::geometry::{Point2, Vector2};
use archi_core::kind::ShapeFamily;
use archi_core::shape::{Geometry, Shape};

use crate::hit_test::{Compass, HandleRole};

/// 缩放时的尺寸下限。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeLimits {
    pub min_size: f64,
    pub min_radius: f64,
}

impl Default for ResizeLimits {
    fn default() -> Self {
        Self {
            min_size: 10.0,
            min_radius: 5.0,
        }
    }
}

/// 平移图元的全部存储坐标，与旋转无关。
#[inline]
pub fn move_shape(shape: &mut Shape, delta: Vector2) {
    shape.translate(delta);
}

/// 绕 `pivot` 旋转 `delta_angle` 弧度。
///
/// 存储坐标保持局部轴对齐：中心点绕枢轴公转，整体刚性平移到新位置，
/// 同时累加 `rotation`。圆只公转，不记录旋转角。
pub fn rotate_shape(shape: &mut Shape, delta_angle: f64, pivot: Point2) {
    if !delta_angle.is_finite() || delta_angle == 0.0 {
        return;
    }
    let center = shape.center();
    let orbited = center.rotate_about(pivot, delta_angle);
    shape.translate(center.vector_to(orbited));
    if shape.family() != ShapeFamily::Radial {
        shape.set_rotation(shape.rotation + delta_angle);
    }
}

/// 按控制柄角色把 `pointer`（世界坐标）应用到图元上。角色与几何族不匹配时不做修改。
///
/// 返回是否发生了修改。
pub fn resize_shape(
    shape: &mut Shape,
    role: HandleRole,
    pointer: Point2,
    limits: &ResizeLimits,
) -> bool {
    match (shape.family(), role) {
        (ShapeFamily::Segment, HandleRole::Start | HandleRole::End) => {
            resize_segment(shape, role == HandleRole::Start, pointer)
        }
        (ShapeFamily::Area, HandleRole::Box(compass)) => {
            resize_box(shape, compass, pointer, limits.min_size)
        }
        (ShapeFamily::Radial, HandleRole::Radius(_)) => {
            let center = shape.center();
            let radius = center.distance(pointer).max(limits.min_radius);
            match &mut shape.geometry {
                Geometry::Radial { radius: stored, .. } => {
                    let changed = *stored != radius;
                    *stored = radius;
                    changed
                }
                _ => false,
            }
        }
        (ShapeFamily::Canopy, HandleRole::Radius(_)) => {
            let center = shape.center();
            let radius = center.distance(pointer).max(limits.min_radius);
            let half = Vector2::new(radius, radius);
            let before = shape.local_box();
            let min = center.translate(half.scale(-1.0));
            let max = center.translate(half);
            shape.set_local_box(min, max);
            before != Some((min, max))
        }
        _ => false,
    }
}

/// 端点拖拽：在世界坐标中替换端点，再以新中点为枢轴换回局部坐标，保持旋转角不变。
fn resize_segment(shape: &mut Shape, moves_start: bool, pointer: Point2) -> bool {
    let Some((world_start, world_end)) = shape.world_segment() else {
        return false;
    };
    let (start, end) = if moves_start {
        (pointer, world_end)
    } else {
        (world_start, pointer)
    };
    if (start, end) == (world_start, world_end) {
        return false;
    }
    let center = start.midpoint(end);
    let rotation = shape.rotation;
    if let Geometry::Span {
        start: stored_start,
        end: stored_end,
    } = &mut shape.geometry
    {
        *stored_start = start.rotate_about(center, -rotation);
        *stored_end = end.rotate_about(center, -rotation);
    }
    true
}

/// 局部坐标系内只移动控制柄对应的边，尺寸不足时夹紧移动边。
/// 对边在世界坐标中保持不动。
fn resize_box(shape: &mut Shape, compass: Compass, pointer: Point2, min_size: f64) -> bool {
    let Some((min, max)) = shape.local_box() else {
        return false;
    };
    let local = shape.to_local(pointer);
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (min.x(), min.y(), max.x(), max.y());
    if compass.moves_west() {
        min_x = local.x().min(max_x - min_size);
    }
    if compass.moves_east() {
        max_x = local.x().max(min_x + min_size);
    }
    if compass.moves_north() {
        min_y = local.y().min(max_y - min_size);
    }
    if compass.moves_south() {
        max_y = local.y().max(min_y + min_size);
    }
    let new_min = Point2::new(min_x, min_y);
    let new_max = Point2::new(max_x, max_y);
    if (new_min, new_max) == (min, max) {
        return false;
    }

    // 新盒子中心在旧局部坐标系下求得，映射到世界后作为新的旋转中心。
    let local_center = new_min.midpoint(new_max);
    let shift = local_center.vector_to(shape.to_world(local_center));
    shape.set_local_box(new_min.translate(shift), new_max.translate(shift));
    true
}
