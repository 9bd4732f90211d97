//! 渲染适配层：只读遍历图元列表，把几何交给具体的绘制后端。

use archi_core::geometry::Point2;
use archi_core::kind::{ShapeFamily, ShapeKind};
use archi_core::shape::{Shape, Style, TextLabel};
use archi_engine::editor::Editor;
use archi_engine::hit_test::Handle;
use glam::{DAffine2, DVec2};

/// 尺寸标注文字的字号。
pub const DIMENSION_FONT_SIZE: f64 = 12.0;

/// 绘制后端需要实现的最小原语集合。
///
/// 每个图元的几何都在其局部坐标系中给出，由 `begin_shape` 声明的旋转帧
/// （绕 `center` 旋转 `rotation`）映射到世界坐标。控制柄始终位于世界坐标。
pub trait Painter {
    fn begin_shape(&mut self, center: Point2, rotation: f64);
    fn end_shape(&mut self);
    fn segment(&mut self, start: Point2, end: Point2, style: &Style);
    fn rect(&mut self, min: Point2, max: Point2, style: &Style);
    fn circle(&mut self, center: Point2, radius: f64, style: &Style);
    fn text(&mut self, anchor: Point2, label: &TextLabel, style: &Style);
    fn handle(&mut self, handle: &Handle);
}

/// 按层级顺序绘制全部图元、绘制中的预览以及选中图元的控制柄。
pub fn paint_editor(editor: &Editor, painter: &mut dyn Painter) {
    for (_, shape) in editor.drawing().shapes() {
        paint_shape(shape, painter);
    }
    if let Some(preview) = editor.preview() {
        paint_shape(&preview, painter);
    }
    for handle in editor
        .selection_resize_handles()
        .iter()
        .chain(editor.selection_rotation_handles().iter())
    {
        painter.handle(handle);
    }
}

pub fn paint_shape(shape: &Shape, painter: &mut dyn Painter) {
    painter.begin_shape(shape.center(), shape.rotation);
    match shape.family() {
        ShapeFamily::Segment => {
            if let Some((start, end)) = shape.span() {
                painter.segment(start, end, &shape.style);
                if shape.kind() == ShapeKind::Dimension {
                    let distance = shape.distance.unwrap_or_else(|| start.distance(end).round());
                    let label = TextLabel::new(format!("{distance}"), DIMENSION_FONT_SIZE, "Arial");
                    painter.text(start.midpoint(end), &label, &shape.style);
                }
            }
        }
        ShapeFamily::Area => {
            if let Some((min, max)) = shape.local_box() {
                painter.rect(min, max, &shape.style);
            }
        }
        ShapeFamily::Radial => {
            if let Some(radius) = shape.radius() {
                painter.circle(shape.center(), radius, &shape.style);
            }
        }
        ShapeFamily::Canopy => {
            if let Some((center, radius)) = shape.canopy() {
                painter.circle(center, radius, &shape.style);
            }
        }
        ShapeFamily::Anchor => {
            if let Some(label) = &shape.label {
                painter.text(shape.center(), label, &shape.style);
            }
        }
    }
    painter.end_shape();
}

/// 记录下来的绘制命令（世界坐标）。
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Segment {
        start: Point2,
        end: Point2,
        stroke: String,
    },
    /// 旋转后的矩形以四个角点表示。
    Polygon {
        corners: [Point2; 4],
        fill: Option<String>,
    },
    Circle {
        center: Point2,
        radius: f64,
    },
    Text {
        anchor: Point2,
        content: String,
        rotation: f64,
    },
    Handle {
        position: Point2,
        size: f64,
        role: &'static str,
    },
}

/// 把绘制调用记录为命令列表的 `Painter`，供 CLI 与测试使用。
#[derive(Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
    frame: Option<(DAffine2, f64)>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }

    fn to_world(&self, point: Point2) -> Point2 {
        match &self.frame {
            Some((transform, _)) => Point2::from_vec(transform.transform_point2(point.as_vec2())),
            None => point,
        }
    }
}

impl Painter for DrawList {
    fn begin_shape(&mut self, center: Point2, rotation: f64) {
        let pivot = center.as_vec2();
        let transform = DAffine2::from_translation(pivot)
            * DAffine2::from_angle(rotation)
            * DAffine2::from_translation(-pivot);
        self.frame = Some((transform, rotation));
    }

    fn end_shape(&mut self) {
        self.frame = None;
    }

    fn segment(&mut self, start: Point2, end: Point2, style: &Style) {
        let command = DrawCommand::Segment {
            start: self.to_world(start),
            end: self.to_world(end),
            stroke: style.stroke_color.clone(),
        };
        self.commands.push(command);
    }

    fn rect(&mut self, min: Point2, max: Point2, style: &Style) {
        let corners = [
            min,
            Point2::new(max.x(), min.y()),
            max,
            Point2::new(min.x(), max.y()),
        ]
        .map(|corner| self.to_world(corner));
        self.commands.push(DrawCommand::Polygon {
            corners,
            fill: style.fill.then(|| style.fill_color.clone()),
        });
    }

    fn circle(&mut self, center: Point2, radius: f64, _style: &Style) {
        let command = DrawCommand::Circle {
            center: self.to_world(center),
            radius,
        };
        self.commands.push(command);
    }

    fn text(&mut self, anchor: Point2, label: &TextLabel, _style: &Style) {
        let rotation = self.frame.as_ref().map_or(0.0, |(_, rotation)| *rotation);
        let command = DrawCommand::Text {
            anchor: self.to_world(anchor),
            content: label.content.clone(),
            rotation,
        };
        self.commands.push(command);
    }

    fn handle(&mut self, handle: &Handle) {
        self.commands.push(DrawCommand::Handle {
            position: handle.position,
            size: handle.size,
            role: handle.role.tag(),
        });
    }
}

/// 世界坐标下 `DVec2` 的简单格式化，供 CLI 摘要使用。
pub fn format_vec(vec: DVec2) -> String {
    format!("({:.2}, {:.2})", vec.x, vec.y)
}
