pub mod command;
pub mod editor;
pub mod erase;
pub mod transform;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq, Eq)]
    pub enum EngineError {
        #[error("shape with id {0} not found")]
        ShapeNotFound(u64),
        #[error("no shape is selected")]
        NothingSelected,
        #[error("shape with id {0} is not a text label")]
        NotText(u64),
        #[error("text content is empty")]
        EmptyText,
    }
}

pub mod settings {
    use archi_core::kind::CapabilityTable;
    use archi_core::shape::CreationLimits;

    use crate::erase::EraseParams;
    use crate::hit_test::HitTolerance;
    use crate::transform::ResizeLimits;

    /// 编辑器可调参数。所有经验常量集中在这里，由配置层覆盖。
    #[derive(Debug, Clone)]
    pub struct EditorSettings {
        pub history_limit: usize,
        pub eraser_diameter: f64,
        pub min_area_size: f64,
        pub min_resize_size: f64,
        pub min_radius: f64,
        pub min_fragment_length: f64,
        pub erase_wedge_degrees: f64,
        pub arc_segments: usize,
        pub line_hit_threshold: f64,
        pub dimension_hit_threshold: f64,
        pub handle_size: f64,
        pub handle_tolerance: f64,
        pub rotation_handle_distance: f64,
        pub paste_offset: f64,
        pub text_erase_width: f64,
        pub grid_size: f64,
        pub snap_to_grid: bool,
        pub capabilities: CapabilityTable,
    }

    impl EditorSettings {
        #[inline]
        pub fn eraser_radius(&self) -> f64 {
            self.eraser_diameter * 0.5
        }

        pub fn creation_limits(&self) -> CreationLimits {
            CreationLimits {
                min_area_size: self.min_area_size,
                min_radius: self.min_radius,
            }
        }

        pub fn resize_limits(&self) -> ResizeLimits {
            ResizeLimits {
                min_size: self.min_resize_size,
                min_radius: self.min_radius,
            }
        }

        pub fn erase_params(&self) -> EraseParams {
            EraseParams {
                radius: self.eraser_radius(),
                min_fragment_length: self.min_fragment_length,
                wedge_angle: self.erase_wedge_degrees.to_radians(),
                arc_segments: self.arc_segments.max(1),
                text_erase_width: self.text_erase_width,
            }
        }

        /// 命中阈值以屏幕像素给出，按当前缩放换算到世界坐标。
        pub fn hit_tolerance(&self, zoom: f64) -> HitTolerance {
            HitTolerance::new(self.line_hit_threshold, self.dimension_hit_threshold, zoom)
        }
    }

    impl Default for EditorSettings {
        fn default() -> Self {
            Self {
                history_limit: 50,
                eraser_diameter: 20.0,
                min_area_size: 20.0,
                min_resize_size: 10.0,
                min_radius: 5.0,
                min_fragment_length: 10.0,
                erase_wedge_degrees: 45.0,
                arc_segments: 20,
                line_hit_threshold: 5.0,
                dimension_hit_threshold: 10.0,
                handle_size: 8.0,
                handle_tolerance: 5.0,
                rotation_handle_distance: 40.0,
                paste_offset: 20.0,
                text_erase_width: 100.0,
                grid_size: 20.0,
                snap_to_grid: false,
                capabilities: CapabilityTable::new(),
            }
        }
    }
}

pub mod history {
    use std::collections::VecDeque;

    use archi_core::shape::Drawing;
    use tracing::debug;

    /// 基于整表快照的撤销/重做栈。
    ///
    /// 游标始终指向与当前图元列表一致的快照；超过容量时淘汰最旧条目，
    /// 只保留最近的 `limit` 个状态。
    #[derive(Debug, Clone)]
    pub struct HistoryManager {
        entries: VecDeque<Drawing>,
        cursor: usize,
        limit: usize,
    }

    impl HistoryManager {
        pub fn new(limit: usize) -> Self {
            Self {
                entries: VecDeque::new(),
                cursor: 0,
                limit: limit.max(1),
            }
        }

        /// 记录一份深拷贝，并丢弃游标之后的重做分支。
        pub fn snapshot(&mut self, drawing: &Drawing) {
            if !self.entries.is_empty() {
                self.entries.truncate(self.cursor + 1);
            }
            self.entries.push_back(drawing.clone());
            while self.entries.len() > self.limit {
                self.entries.pop_front();
            }
            self.cursor = self.entries.len() - 1;
            debug!(cursor = self.cursor, len = self.entries.len(), "记录历史快照");
        }

        /// 后退一步，返回需要恢复的快照；已在最早状态时返回 None。
        pub fn undo(&mut self) -> Option<&Drawing> {
            if !self.can_undo() {
                return None;
            }
            self.cursor -= 1;
            self.entries.get(self.cursor)
        }

        pub fn redo(&mut self) -> Option<&Drawing> {
            if !self.can_redo() {
                return None;
            }
            self.cursor += 1;
            self.entries.get(self.cursor)
        }

        #[inline]
        pub fn can_undo(&self) -> bool {
            !self.entries.is_empty() && self.cursor > 0
        }

        #[inline]
        pub fn can_redo(&self) -> bool {
            self.cursor + 1 < self.entries.len()
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entries.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }

        #[inline]
        pub fn cursor(&self) -> usize {
            self.cursor
        }

        #[inline]
        pub fn limit(&self) -> usize {
            self.limit
        }

        #[inline]
        pub fn current(&self) -> Option<&Drawing> {
            self.entries.get(self.cursor)
        }

        /// 清空历史，仅保留给定状态作为唯一条目。
        pub fn reset(&mut self, drawing: &Drawing) {
            self.entries.clear();
            self.cursor = 0;
            self.snapshot(drawing);
        }
    }

}

pub mod viewport {
    use archi_core::geometry::{Point2, Vector2};

    pub const DEFAULT_ZOOM: f64 = 1.0;
    pub const MIN_ZOOM: f64 = 0.3;
    pub const MAX_ZOOM: f64 = 3.0;
    pub const ZOOM_IN_FACTOR: f64 = 1.2;
    pub const ZOOM_OUT_FACTOR: f64 = 0.8;

    /// 视口状态（平移中心与缩放）。
    #[derive(Debug, Clone, Copy)]
    pub struct ViewportState {
        pub center: Point2,
        pub zoom: f64,
    }

    impl ViewportState {
        #[inline]
        fn clamp_zoom(value: f64) -> f64 {
            value.clamp(MIN_ZOOM, MAX_ZOOM)
        }

        pub fn set_zoom(&mut self, zoom: f64) {
            if zoom.is_finite() {
                self.zoom = Self::clamp_zoom(zoom);
            }
        }

        /// 按乘法因子调整缩放。
        pub fn scale_zoom(&mut self, factor: f64) {
            if factor.is_finite() {
                self.set_zoom(self.zoom * factor);
            }
        }

        pub fn pan(&mut self, delta: Vector2) {
            self.center = self.center.translate(delta);
        }
    }

    impl Default for ViewportState {
        fn default() -> Self {
            Self {
                center: Point2::new(0.0, 0.0),
                zoom: DEFAULT_ZOOM,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn zoom_is_clamped() {
            let mut viewport = ViewportState::default();
            viewport.set_zoom(10.0);
            assert!((viewport.zoom - MAX_ZOOM).abs() < f64::EPSILON);
            viewport.set_zoom(0.01);
            assert!((viewport.zoom - MIN_ZOOM).abs() < f64::EPSILON);
            viewport.set_zoom(f64::NAN);
            assert!((viewport.zoom - MIN_ZOOM).abs() < f64::EPSILON);

            viewport.set_zoom(1.0);
            viewport.scale_zoom(ZOOM_IN_FACTOR);
            assert!((viewport.zoom - 1.2).abs() < 1e-12);
        }

        #[test]
        fn pan_moves_center() {
            let mut viewport = ViewportState::default();
            viewport.pan(Vector2::new(5.0, -3.0));
            assert_eq!(viewport.center, Point2::new(5.0, -3.0));
        }
    }
}
