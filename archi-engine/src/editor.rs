use std::f64::consts::FRAC_PI_2;
use std::fmt;

use archi_core::geometry::{Bounds2D, Point2, Vector2, snap_to_grid};
use archi_core::kind::{ErasePolicy, ShapeFamily, ShapeKind};
use archi_core::shape::{
    Drawing, HeuristicTextMeasure, Shape, ShapeId, Style, TextLabel, TextMeasure,
};
use tracing::{debug, info};

use crate::erase::{EraseReport, erase_at};
use crate::errors::EngineError;
use crate::hit_test::{
    Handle, HandleRole, is_point_in_shape, pick_handle, resize_handles, rotation_handles,
};
use crate::history::HistoryManager;
use crate::settings::EditorSettings;
use crate::transform::{move_shape, resize_shape, rotate_shape};
use crate::viewport::{ViewportState, ZOOM_IN_FACTOR, ZOOM_OUT_FACTOR};

pub const DEFAULT_FONT_SIZE: f64 = 16.0;
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// 当前工具。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Select,
    Erase,
    Draw(ShapeKind),
}

/// 指针手势状态机。任一时刻至多一个拖拽类手势处于活动状态。
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Idle,
    Drawing {
        kind: ShapeKind,
        start: Point2,
        current: Point2,
    },
    Dragging {
        id: ShapeId,
        last: Point2,
        moved: bool,
    },
    Rotating {
        id: ShapeId,
        pivot: Point2,
        last_angle: f64,
        moved: bool,
    },
    Resizing {
        id: ShapeId,
        role: HandleRole,
        moved: bool,
    },
    Erasing {
        changed: bool,
    },
}

impl Gesture {
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }
}

/// 编辑器状态：图元列表、选中项、剪贴板、历史、视口、设置与手势状态集中在一个控制器中。
pub struct Editor {
    drawing: Drawing,
    selected: Option<ShapeId>,
    clipboard: Option<Shape>,
    history: HistoryManager,
    viewport: ViewportState,
    settings: EditorSettings,
    tool: Tool,
    gesture: Gesture,
    style: Style,
    measure: Box<dyn TextMeasure + Send + Sync>,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("shapes", &self.drawing.len())
            .field("selected", &self.selected)
            .field("tool", &self.tool)
            .field("gesture", &self.gesture)
            .field("zoom", &self.viewport.zoom)
            .finish_non_exhaustive()
    }
}

impl Editor {
    pub fn new(settings: EditorSettings) -> Self {
        Self::with_drawing(Drawing::new(), settings)
    }

    /// 使用现有图元列表初始化，历史以该状态作为唯一条目。
    pub fn with_drawing(drawing: Drawing, settings: EditorSettings) -> Self {
        let mut history = HistoryManager::new(settings.history_limit);
        history.reset(&drawing);
        Self {
            drawing,
            selected: None,
            clipboard: None,
            history,
            viewport: ViewportState::default(),
            settings,
            tool: Tool::Select,
            gesture: Gesture::Idle,
            style: Style::default(),
            measure: Box::new(HeuristicTextMeasure),
        }
    }

    pub fn with_text_measure(mut self, measure: Box<dyn TextMeasure + Send + Sync>) -> Self {
        self.measure = measure;
        self
    }

    /// 替换整个图元列表（加载文件），重置选中、手势与历史。
    pub fn load_drawing(&mut self, drawing: Drawing) {
        self.drawing = drawing;
        self.selected = None;
        self.gesture = Gesture::Idle;
        self.history.reset(&self.drawing);
        if let Some(bounds) = self.drawing.bounds() {
            self.viewport.center = bounds.center();
        }
        info!(shapes = self.drawing.len(), "已加载图元列表");
    }

    #[inline]
    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    #[inline]
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    #[inline]
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    #[inline]
    pub fn text_measure(&self) -> &dyn TextMeasure {
        self.measure.as_ref()
    }

    pub fn set_erase_policy(&mut self, kind: ShapeKind, policy: ErasePolicy) -> bool {
        self.settings.capabilities.set_erase_policy(kind, policy)
    }

    #[inline]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// 切换工具会中止进行中的手势（与指针离开画布相同）。
    pub fn set_tool(&mut self, tool: Tool) {
        if !self.gesture.is_idle() {
            self.pointer_leave();
        }
        self.tool = tool;
    }

    #[inline]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    #[inline]
    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    // ---- 选中 ----

    #[inline]
    pub fn selected(&self) -> Option<ShapeId> {
        self.selected
    }

    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selected.and_then(|id| self.drawing.shape(id))
    }

    pub fn select(&mut self, id: ShapeId) -> Result<(), EngineError> {
        if !self.drawing.contains(id) {
            return Err(EngineError::ShapeNotFound(id.get()));
        }
        self.selected = Some(id);
        Ok(())
    }

    #[inline]
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// 自顶向下查找指针下的图元。
    pub fn shape_at(&self, point: Point2) -> Option<ShapeId> {
        let tolerance = self.settings.hit_tolerance(self.viewport.zoom);
        let measure = self.measure.as_ref();
        self.drawing
            .topmost(|shape| is_point_in_shape(point, shape, &tolerance, measure))
    }

    fn contains_point(&self, id: ShapeId, point: Point2) -> bool {
        let tolerance = self.settings.hit_tolerance(self.viewport.zoom);
        self.drawing
            .shape(id)
            .is_some_and(|shape| is_point_in_shape(point, shape, &tolerance, self.measure.as_ref()))
    }

    /// 选中图元的缩放控制柄，尺寸换算到世界坐标。
    pub fn selection_resize_handles(&self) -> Vec<Handle> {
        self.selected_shape()
            .map(|shape| resize_handles(shape, self.settings.handle_size / self.viewport.zoom))
            .unwrap_or_default()
    }

    pub fn selection_rotation_handles(&self) -> Vec<Handle> {
        self.selected_shape()
            .map(|shape| {
                rotation_handles(
                    shape,
                    self.settings.rotation_handle_distance,
                    self.settings.handle_size / self.viewport.zoom,
                )
            })
            .unwrap_or_default()
    }

    // ---- 指针手势 ----

    fn snap(&self, point: Point2) -> Point2 {
        if self.settings.snap_to_grid {
            snap_to_grid(point, self.settings.grid_size)
        } else {
            point
        }
    }

    /// 指针按下（世界坐标）。已有手势进行中时忽略。
    pub fn pointer_down(&mut self, point: Point2) {
        if !self.gesture.is_idle() {
            debug!(gesture = ?self.gesture, "手势进行中，忽略按下事件");
            return;
        }
        let point = self.snap(point);
        match self.tool {
            Tool::Select => self.begin_select_gesture(point),
            Tool::Erase => {
                let report = self.erase_sample(point);
                self.gesture = Gesture::Erasing {
                    changed: report.changed(),
                };
            }
            Tool::Draw(ShapeKind::Text) => {}
            Tool::Draw(kind) => {
                self.gesture = Gesture::Drawing {
                    kind,
                    start: point,
                    current: point,
                };
            }
        }
    }

    fn begin_select_gesture(&mut self, point: Point2) {
        let tolerance = self.settings.handle_tolerance / self.viewport.zoom;
        if let Some(id) = self.selected {
            let rotation = self.selection_rotation_handles();
            if pick_handle(point, &rotation, tolerance).is_some() {
                if let Some(shape) = self.drawing.shape(id) {
                    let pivot = shape.center();
                    self.gesture = Gesture::Rotating {
                        id,
                        pivot,
                        last_angle: angle_from(pivot, point),
                        moved: false,
                    };
                    return;
                }
            }
            let resize = self.selection_resize_handles();
            if let Some(handle) = pick_handle(point, &resize, tolerance) {
                self.gesture = Gesture::Resizing {
                    id,
                    role: handle.role,
                    moved: false,
                };
                return;
            }
        }

        // 已选中的图元优先于覆盖在它上面的图元。
        let target = self
            .selected
            .filter(|id| self.contains_point(*id, point))
            .or_else(|| self.shape_at(point));
        match target {
            Some(id) => {
                self.selected = Some(id);
                self.gesture = Gesture::Dragging {
                    id,
                    last: point,
                    moved: false,
                };
            }
            None => self.selected = None,
        }
    }

    /// 指针移动：仅修改状态，不记录历史。
    pub fn pointer_move(&mut self, point: Point2) {
        let point = self.snap(point);
        let eraser = matches!(self.gesture, Gesture::Erasing { .. });
        let erased = if eraser {
            self.erase_sample(point).changed()
        } else {
            false
        };
        let limits = self.settings.resize_limits();
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Drawing { current, .. } => *current = point,
            Gesture::Dragging { id, last, moved } => {
                let delta = last.vector_to(point);
                if delta.length_squared() > 0.0 {
                    if let Some(shape) = self.drawing.shape_mut(*id) {
                        move_shape(shape, delta);
                        *moved = true;
                    }
                }
                *last = point;
            }
            Gesture::Rotating {
                id,
                pivot,
                last_angle,
                moved,
            } => {
                let angle = angle_from(*pivot, point);
                let delta = angle - *last_angle;
                if delta != 0.0 {
                    if let Some(shape) = self.drawing.shape_mut(*id) {
                        rotate_shape(shape, delta, *pivot);
                        *moved = true;
                    }
                }
                *last_angle = angle;
            }
            Gesture::Resizing { id, role, moved } => {
                if let Some(shape) = self.drawing.shape_mut(*id) {
                    *moved |= resize_shape(shape, *role, point, &limits);
                }
            }
            Gesture::Erasing { changed } => *changed |= erased,
        }
    }

    /// 指针抬起：结束手势，发生净变化时记录一次快照。
    pub fn pointer_up(&mut self, point: Point2) {
        // 擦除只在按下与移动时采样。
        if !matches!(self.gesture, Gesture::Erasing { .. }) {
            self.pointer_move(point);
        }
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Idle => {}
            Gesture::Drawing {
                kind,
                start,
                current,
            } => {
                if let Some(shape) = self.drawing_preview(kind, start, current) {
                    let id = self.drawing.add_shape(shape);
                    debug!(id = id.get(), kind = %kind, "已创建图元");
                    self.commit();
                }
            }
            Gesture::Dragging { moved, .. }
            | Gesture::Rotating { moved, .. }
            | Gesture::Resizing { moved, .. } => {
                if moved {
                    self.commit();
                }
            }
            Gesture::Erasing { changed } => {
                if changed {
                    if self.selected.is_some_and(|id| !self.drawing.contains(id)) {
                        self.selected = None;
                    }
                    self.commit();
                }
            }
        }
    }

    /// 指针离开画布：丢弃未完成的绘制；其余手势仅在有净变化时提交。
    pub fn pointer_leave(&mut self) {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        let changed = match gesture {
            Gesture::Idle | Gesture::Drawing { .. } => false,
            Gesture::Dragging { moved, .. }
            | Gesture::Rotating { moved, .. }
            | Gesture::Resizing { moved, .. } => moved,
            Gesture::Erasing { changed } => changed,
        };
        if changed {
            if self.selected.is_some_and(|id| !self.drawing.contains(id)) {
                self.selected = None;
            }
            self.commit();
        }
    }

    /// 正在绘制的图元预览，供渲染端显示橡皮筋效果。
    pub fn preview(&self) -> Option<Shape> {
        match &self.gesture {
            Gesture::Drawing {
                kind,
                start,
                current,
            } => self.drawing_preview(*kind, *start, *current),
            _ => None,
        }
    }

    fn drawing_preview(&self, kind: ShapeKind, start: Point2, end: Point2) -> Option<Shape> {
        // 零长度线段没有意义；区域类与圆由最小尺寸兜底。
        if kind.family() == ShapeFamily::Segment && start == end {
            return None;
        }
        let style = if kind == ShapeKind::Dimension {
            Style::dimension()
        } else {
            self.style.clone()
        };
        Shape::from_drag(kind, start, end, style, &self.settings.creation_limits())
    }

    fn erase_sample(&mut self, point: Point2) -> EraseReport {
        let params = self.settings.erase_params();
        erase_at(
            &mut self.drawing,
            point,
            &params,
            &self.settings.capabilities,
        )
    }

    /// 直接创建图元（脚本或导入使用），记录一次快照。
    pub fn create_shape(&mut self, kind: ShapeKind, start: Point2, end: Point2) -> Option<ShapeId> {
        let shape = self.drawing_preview(kind, self.snap(start), self.snap(end))?;
        let id = self.drawing.add_shape(shape);
        self.commit();
        Some(id)
    }

    // ---- 编辑操作 ----

    pub fn delete_selected(&mut self) -> Option<ShapeId> {
        let id = self.selected.take()?;
        self.drawing.remove(id)?;
        debug!(id = id.get(), "已删除图元");
        self.commit();
        Some(id)
    }

    pub fn delete_shape(&mut self, id: ShapeId) -> Result<Shape, EngineError> {
        let shape = self
            .drawing
            .remove(id)
            .ok_or(EngineError::ShapeNotFound(id.get()))?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.commit();
        Ok(shape)
    }

    pub fn copy_selected(&mut self) -> bool {
        match self.selected_shape() {
            Some(shape) => {
                self.clipboard = Some(shape.clone());
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn clipboard(&self) -> Option<&Shape> {
        self.clipboard.as_ref()
    }

    /// 粘贴剪贴板内容并偏移；剪贴板随之前移，连续粘贴不会重叠。
    pub fn paste(&mut self) -> Option<ShapeId> {
        let offset = self.paste_offset();
        let clipboard = self.clipboard.as_mut()?;
        move_shape(clipboard, offset);
        let copy = clipboard.clone();
        let id = self.drawing.add_shape(copy);
        self.selected = Some(id);
        self.commit();
        Some(id)
    }

    pub fn duplicate_selected(&mut self) -> Option<ShapeId> {
        let mut copy = self.selected_shape()?.clone();
        move_shape(&mut copy, self.paste_offset());
        let id = self.drawing.add_shape(copy);
        self.selected = Some(id);
        self.commit();
        Some(id)
    }

    fn paste_offset(&self) -> Vector2 {
        Vector2::new(self.settings.paste_offset, self.settings.paste_offset)
    }

    /// 在锚点处放置文字。内容去除首尾空白后为空则拒绝。
    pub fn add_text(&mut self, anchor: Point2, content: &str) -> Result<ShapeId, EngineError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::EmptyText);
        }
        let label = TextLabel::new(content, DEFAULT_FONT_SIZE, DEFAULT_FONT_FAMILY);
        let id = self
            .drawing
            .add_shape(Shape::text(self.snap(anchor), label, self.style.clone()));
        self.commit();
        Ok(id)
    }

    /// 修改选中文字。空内容保持原文字不变并返回 false。
    pub fn edit_selected_text(&mut self, content: &str) -> Result<bool, EngineError> {
        let id = self.selected.ok_or(EngineError::NothingSelected)?;
        let shape = self
            .drawing
            .shape_mut(id)
            .ok_or(EngineError::ShapeNotFound(id.get()))?;
        let label = shape.label.as_mut().ok_or(EngineError::NotText(id.get()))?;
        let content = content.trim();
        if content.is_empty() || label.content == content {
            return Ok(false);
        }
        label.content = content.to_string();
        self.commit();
        Ok(true)
    }

    /// 绕选中图元自身中心旋转。
    pub fn rotate_selected(&mut self, angle: f64) -> bool {
        let Some(shape) = self.selected.and_then(|id| self.drawing.shape_mut(id)) else {
            return false;
        };
        let pivot = shape.center();
        rotate_shape(shape, angle, pivot);
        self.commit();
        true
    }

    #[inline]
    pub fn rotate_selected_quarter(&mut self) -> bool {
        self.rotate_selected(FRAC_PI_2)
    }

    pub fn bring_to_front(&mut self) -> bool {
        let moved = self
            .selected
            .is_some_and(|id| self.drawing.bring_to_front(id));
        if moved {
            self.commit();
        }
        moved
    }

    pub fn send_to_back(&mut self) -> bool {
        let moved = self
            .selected
            .is_some_and(|id| self.drawing.send_to_back(id));
        if moved {
            self.commit();
        }
        moved
    }

    /// 清空画布。
    pub fn clear(&mut self) {
        self.drawing.clear();
        self.selected = None;
        self.gesture = Gesture::Idle;
        self.commit();
        info!("画布已清空");
    }

    // ---- 历史 ----

    fn commit(&mut self) {
        self.history.snapshot(&self.drawing);
    }

    /// 以当前状态作为历史起点，丢弃全部撤销/重做记录。
    pub fn reset_history(&mut self) {
        self.history.reset(&self.drawing);
    }

    /// 撤销。处于最早状态时为空操作并返回 false。
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.drawing.restore_from(snapshot);
        self.selected = None;
        self.gesture = Gesture::Idle;
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.drawing.restore_from(snapshot);
        self.selected = None;
        self.gesture = Gesture::Idle;
        true
    }

    // ---- 视口 ----

    #[inline]
    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    #[inline]
    pub fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.set_zoom(zoom);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.scale_zoom(ZOOM_IN_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.viewport.scale_zoom(ZOOM_OUT_FACTOR);
    }

    pub fn zoom_reset(&mut self) {
        self.viewport = ViewportState::default();
    }

    /// 所有图元范围的并集，用于适配视图。
    pub fn fit_bounds(&self) -> Option<Bounds2D> {
        let mut bounds = Bounds2D::empty();
        let mut has = false;
        for (_, shape) in self.drawing.shapes() {
            let shape_bounds = shape.bounds_with(self.measure.as_ref());
            if !shape_bounds.is_empty() {
                bounds.include_bounds(&shape_bounds);
                has = true;
            }
        }
        if has { Some(bounds) } else { None }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

#[inline]
fn angle_from(pivot: Point2, point: Point2) -> f64 {
    let offset = pivot.vector_to(point);
    offset.y().atan2(offset.x())
}
