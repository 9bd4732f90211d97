pub mod geometry {
    use std::f64::consts::TAU;

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，所有坐标均为双精度。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn midpoint(self, other: Point2) -> Point2 {
            Self((self.0 + other.0) * 0.5)
        }

        /// 绕 `center` 旋转 `angle` 弧度（逆时针为正，画布坐标系下表现为顺时针）。
        #[inline]
        pub fn rotate_about(self, center: Point2, angle: f64) -> Point2 {
            let offset = self.0 - center.0;
            Self(center.0 + DVec2::from_angle(angle).rotate(offset))
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        /// 单位化；零向量返回 None。
        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }

        #[inline]
        pub fn rotate(self, angle: f64) -> Self {
            Self(DVec2::from_angle(angle).rotate(self.0))
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于命中测试、橡皮擦预筛与适配视图。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        /// 由任意两个角点构造，自动规整 min/max。
        pub fn from_corners(a: Point2, b: Point2) -> Self {
            Self {
                min: Point2::from_vec(a.as_vec2().min(b.as_vec2())),
                max: Point2::from_vec(a.as_vec2().max(b.as_vec2())),
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        /// 闭区间包含判定。
        #[inline]
        pub fn contains(&self, point: Point2) -> bool {
            point.x() >= self.min.x()
                && point.x() <= self.max.x()
                && point.y() >= self.min.y()
                && point.y() <= self.max.y()
        }

        pub fn expanded(&self, margin: f64) -> Self {
            if self.is_empty() {
                return *self;
            }
            let delta = DVec2::splat(margin);
            Self {
                min: Point2::from_vec(self.min.as_vec2() - delta),
                max: Point2::from_vec(self.max.as_vec2() + delta),
            }
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }

    /// 点到线段 `[a, b]` 的最近点；退化线段（`a == b`）直接返回 `a`。
    pub fn closest_point_on_segment(point: Point2, a: Point2, b: Point2) -> Point2 {
        let ab = b.as_vec2() - a.as_vec2();
        let len_sq = ab.length_squared();
        if len_sq <= f64::EPSILON {
            return a;
        }
        let t = ((point.as_vec2() - a.as_vec2()).dot(ab) / len_sq).clamp(0.0, 1.0);
        Point2::from_vec(a.as_vec2() + ab * t)
    }

    #[inline]
    pub fn distance_point_to_segment(point: Point2, a: Point2, b: Point2) -> f64 {
        point.distance(closest_point_on_segment(point, a, b))
    }

    #[inline]
    pub fn is_near_segment(point: Point2, a: Point2, b: Point2, threshold: f64) -> bool {
        distance_point_to_segment(point, a, b) <= threshold
    }

    /// 将点量化到最近的网格交点。非法网格尺寸时原样返回。
    pub fn snap_to_grid(point: Point2, grid_size: f64) -> Point2 {
        if !(grid_size.is_finite() && grid_size > 0.0) {
            return point;
        }
        Point2::new(
            (point.x() / grid_size).round() * grid_size,
            (point.y() / grid_size).round() * grid_size,
        )
    }

    /// 把角度规整到 `[0, 2π)`。
    pub fn normalize_angle(angle: f64) -> f64 {
        let mut result = angle % TAU;
        if result < 0.0 {
            result += TAU;
        }
        if result >= TAU { 0.0 } else { result }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::f64::consts::{FRAC_PI_2, PI};

        #[test]
        fn closest_point_clamps_to_segment_ends() {
            let a = Point2::new(0.0, 0.0);
            let b = Point2::new(10.0, 0.0);
            let before = closest_point_on_segment(Point2::new(-5.0, 3.0), a, b);
            assert_eq!(before, a);
            let after = closest_point_on_segment(Point2::new(15.0, -3.0), a, b);
            assert_eq!(after, b);
            let inside = closest_point_on_segment(Point2::new(4.0, 7.0), a, b);
            assert!((inside.x() - 4.0).abs() < 1e-12);
            assert!(inside.y().abs() < 1e-12);
        }

        #[test]
        fn zero_length_segment_returns_start() {
            let a = Point2::new(3.0, 4.0);
            let closest = closest_point_on_segment(Point2::new(0.0, 0.0), a, a);
            assert_eq!(closest, a);
            assert!((distance_point_to_segment(Point2::new(0.0, 0.0), a, a) - 5.0).abs() < 1e-12);
        }

        #[test]
        fn near_segment_is_inclusive() {
            let a = Point2::new(0.0, 0.0);
            let b = Point2::new(10.0, 0.0);
            assert!(is_near_segment(Point2::new(5.0, 5.0), a, b, 5.0));
            assert!(!is_near_segment(Point2::new(5.0, 5.1), a, b, 5.0));
        }

        #[test]
        fn rotate_about_quarter_turn() {
            let rotated = Point2::new(2.0, 1.0).rotate_about(Point2::new(1.0, 1.0), FRAC_PI_2);
            assert!((rotated.x() - 1.0).abs() < 1e-12);
            assert!((rotated.y() - 2.0).abs() < 1e-12);
        }

        #[test]
        fn snap_rounds_to_grid() {
            let snapped = snap_to_grid(Point2::new(29.0, -11.0), 20.0);
            assert_eq!(snapped, Point2::new(20.0, -20.0));
            let untouched = snap_to_grid(Point2::new(29.0, 11.0), 0.0);
            assert_eq!(untouched, Point2::new(29.0, 11.0));
        }

        #[test]
        fn normalize_angle_wraps_into_range() {
            assert!((normalize_angle(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < 1e-12);
            assert!((normalize_angle(5.0 * PI) - PI).abs() < 1e-12);
            assert_eq!(normalize_angle(TAU), 0.0);
            assert_eq!(normalize_angle(-1e-18), 0.0);
        }

        #[test]
        fn bounds_contains_and_expands() {
            let bounds = Bounds2D::from_corners(Point2::new(10.0, 8.0), Point2::new(0.0, 0.0));
            assert_eq!(bounds.min(), Point2::new(0.0, 0.0));
            assert!(bounds.contains(Point2::new(10.0, 8.0)));
            assert!(!bounds.contains(Point2::new(10.5, 8.0)));
            assert!(bounds.expanded(1.0).contains(Point2::new(10.5, 8.0)));
            assert!((bounds.width() - 10.0).abs() < f64::EPSILON);
        }
    }
}

pub mod kind {
    use std::collections::HashMap;
    use std::fmt;

    use serde::{Deserialize, Serialize};

    /// 图元种类。法语别名（gaine / poteau / conduit / poutre）在反序列化时等价处理。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ShapeKind {
        Line,
        Wall,
        Rectangle,
        Circle,
        Door,
        Window,
        Stairs,
        Elevator,
        Technical,
        Furniture,
        Bathroom,
        Kitchen,
        Tree,
        Dimension,
        Text,
        #[serde(alias = "gaine")]
        Duct,
        #[serde(alias = "poteau")]
        Column,
        #[serde(alias = "conduit")]
        Pipe,
        #[serde(alias = "poutre")]
        Beam,
    }

    impl ShapeKind {
        pub const ALL: [ShapeKind; 19] = [
            ShapeKind::Line,
            ShapeKind::Wall,
            ShapeKind::Rectangle,
            ShapeKind::Circle,
            ShapeKind::Door,
            ShapeKind::Window,
            ShapeKind::Stairs,
            ShapeKind::Elevator,
            ShapeKind::Technical,
            ShapeKind::Furniture,
            ShapeKind::Bathroom,
            ShapeKind::Kitchen,
            ShapeKind::Tree,
            ShapeKind::Dimension,
            ShapeKind::Text,
            ShapeKind::Duct,
            ShapeKind::Column,
            ShapeKind::Pipe,
            ShapeKind::Beam,
        ];

        pub fn name(self) -> &'static str {
            match self {
                ShapeKind::Line => "line",
                ShapeKind::Wall => "wall",
                ShapeKind::Rectangle => "rectangle",
                ShapeKind::Circle => "circle",
                ShapeKind::Door => "door",
                ShapeKind::Window => "window",
                ShapeKind::Stairs => "stairs",
                ShapeKind::Elevator => "elevator",
                ShapeKind::Technical => "technical",
                ShapeKind::Furniture => "furniture",
                ShapeKind::Bathroom => "bathroom",
                ShapeKind::Kitchen => "kitchen",
                ShapeKind::Tree => "tree",
                ShapeKind::Dimension => "dimension",
                ShapeKind::Text => "text",
                ShapeKind::Duct => "duct",
                ShapeKind::Column => "column",
                ShapeKind::Pipe => "pipe",
                ShapeKind::Beam => "beam",
            }
        }

        /// 按名称解析（大小写不敏感，接受别名）。
        pub fn from_name(name: &str) -> Option<Self> {
            let lowered = name.trim().to_ascii_lowercase();
            let canonical = match lowered.as_str() {
                "gaine" => "duct",
                "poteau" => "column",
                "conduit" => "pipe",
                "poutre" => "beam",
                other => other,
            };
            Self::ALL.into_iter().find(|kind| kind.name() == canonical)
        }

        pub fn family(self) -> ShapeFamily {
            match self {
                ShapeKind::Line | ShapeKind::Wall | ShapeKind::Dimension => ShapeFamily::Segment,
                ShapeKind::Circle => ShapeFamily::Radial,
                ShapeKind::Tree => ShapeFamily::Canopy,
                ShapeKind::Text => ShapeFamily::Anchor,
                ShapeKind::Rectangle
                | ShapeKind::Door
                | ShapeKind::Window
                | ShapeKind::Stairs
                | ShapeKind::Elevator
                | ShapeKind::Technical
                | ShapeKind::Furniture
                | ShapeKind::Bathroom
                | ShapeKind::Kitchen
                | ShapeKind::Duct
                | ShapeKind::Column
                | ShapeKind::Pipe
                | ShapeKind::Beam => ShapeFamily::Area,
            }
        }

        pub fn default_erase_policy(self) -> ErasePolicy {
            match self.family() {
                ShapeFamily::Segment => ErasePolicy::Split,
                ShapeFamily::Area => ErasePolicy::Decompose,
                ShapeFamily::Radial => ErasePolicy::ArcApproximation,
                ShapeFamily::Canopy | ShapeFamily::Anchor => ErasePolicy::Atomic,
            }
        }
    }

    impl fmt::Display for ShapeKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.name())
        }
    }

    /// 几何族：决定存储字段、命中测试与控制柄布局。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ShapeFamily {
        /// 两端点线段：line / wall / dimension。
        Segment,
        /// 两角点矩形区域。
        Area,
        /// 圆心 + 半径。
        Radial,
        /// 以包围盒内切圆表示的树冠。
        Canopy,
        /// 单锚点文字。
        Anchor,
    }

    /// 橡皮擦对某类图元的处理策略。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ErasePolicy {
        /// 线段截短或一分为二。
        Split,
        /// 拆成四条边后逐边按线段处理。
        Decompose,
        /// 去掉一个楔形角度，剩余圆弧用折线近似。
        ArcApproximation,
        /// 触碰即整体删除。
        Atomic,
    }

    /// 种类 → 擦除策略的查找表，允许按种类覆盖默认策略。
    #[derive(Debug, Clone, Default)]
    pub struct CapabilityTable {
        erase_overrides: HashMap<ShapeKind, ErasePolicy>,
    }

    impl CapabilityTable {
        pub fn new() -> Self {
            Self::default()
        }

        #[inline]
        pub fn family(&self, kind: ShapeKind) -> ShapeFamily {
            kind.family()
        }

        pub fn erase_policy(&self, kind: ShapeKind) -> ErasePolicy {
            self.erase_overrides
                .get(&kind)
                .copied()
                .unwrap_or_else(|| kind.default_erase_policy())
        }

        /// 覆盖某种类的擦除策略。策略与几何族不匹配时拒绝并返回 false。
        pub fn set_erase_policy(&mut self, kind: ShapeKind, policy: ErasePolicy) -> bool {
            if !policy_fits_family(kind.family(), policy) {
                return false;
            }
            self.erase_overrides.insert(kind, policy);
            true
        }

        pub fn overrides(&self) -> impl Iterator<Item = (ShapeKind, ErasePolicy)> + '_ {
            self.erase_overrides
                .iter()
                .map(|(kind, policy)| (*kind, *policy))
        }
    }

    fn policy_fits_family(family: ShapeFamily, policy: ErasePolicy) -> bool {
        matches!(
            (family, policy),
            (_, ErasePolicy::Atomic)
                | (ShapeFamily::Segment, ErasePolicy::Split)
                | (ShapeFamily::Area, ErasePolicy::Decompose)
                | (ShapeFamily::Radial, ErasePolicy::ArcApproximation)
        )
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn names_round_trip_and_aliases_resolve() {
            for kind in ShapeKind::ALL {
                assert_eq!(ShapeKind::from_name(kind.name()), Some(kind));
            }
            assert_eq!(ShapeKind::from_name("Poteau"), Some(ShapeKind::Column));
            assert_eq!(ShapeKind::from_name("gaine"), Some(ShapeKind::Duct));
            assert_eq!(ShapeKind::from_name("conduit"), Some(ShapeKind::Pipe));
            assert_eq!(ShapeKind::from_name("poutre"), Some(ShapeKind::Beam));
            assert_eq!(ShapeKind::from_name("hexagon"), None);
        }

        #[test]
        fn families_match_erase_defaults() {
            assert_eq!(ShapeKind::Wall.default_erase_policy(), ErasePolicy::Split);
            assert_eq!(ShapeKind::Dimension.family(), ShapeFamily::Segment);
            assert_eq!(ShapeKind::Beam.default_erase_policy(), ErasePolicy::Decompose);
            assert_eq!(
                ShapeKind::Circle.default_erase_policy(),
                ErasePolicy::ArcApproximation
            );
            assert_eq!(ShapeKind::Tree.default_erase_policy(), ErasePolicy::Atomic);
            assert_eq!(ShapeKind::Text.default_erase_policy(), ErasePolicy::Atomic);
        }

        #[test]
        fn overrides_reject_mismatched_policies() {
            let mut table = CapabilityTable::new();
            assert!(table.set_erase_policy(ShapeKind::Column, ErasePolicy::Atomic));
            assert_eq!(table.erase_policy(ShapeKind::Column), ErasePolicy::Atomic);
            assert_eq!(table.erase_policy(ShapeKind::Duct), ErasePolicy::Decompose);

            assert!(!table.set_erase_policy(ShapeKind::Tree, ErasePolicy::Decompose));
            assert!(!table.set_erase_policy(ShapeKind::Wall, ErasePolicy::ArcApproximation));
            assert_eq!(table.erase_policy(ShapeKind::Tree), ErasePolicy::Atomic);
            assert_eq!(table.overrides().count(), 1);
        }
    }
}

pub mod shape {
    use std::f64::consts::TAU;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2, Vector2, normalize_angle};
    use crate::kind::{ShapeFamily, ShapeKind};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct ShapeId(u64);

    impl ShapeId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    /// 仅影响呈现的样式字段。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Style {
        pub stroke_color: String,
        pub stroke_width: f64,
        pub fill_color: String,
        pub fill: bool,
    }

    impl Style {
        /// 尺寸标注默认使用红色细线。
        pub fn dimension() -> Self {
            Self {
                stroke_color: "#ff0000".to_string(),
                stroke_width: 1.0,
                ..Self::default()
            }
        }
    }

    impl Default for Style {
        fn default() -> Self {
            Self {
                stroke_color: "#000000".to_string(),
                stroke_width: 2.0,
                fill_color: "#ffffff".to_string(),
                fill: false,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TextLabel {
        pub content: String,
        pub font_size: f64,
        pub font_family: String,
    }

    impl TextLabel {
        pub fn new(content: impl Into<String>, font_size: f64, font_family: impl Into<String>) -> Self {
            Self {
                content: content.into(),
                font_size,
                font_family: font_family.into(),
            }
        }
    }

    /// 文字宽度测量协作者。真实渲染端可接入字体度量。
    pub trait TextMeasure {
        fn text_width(&self, label: &TextLabel) -> f64;
    }

    /// 无字体信息时的估算：每个字符按 0.6 倍字号计宽。
    #[derive(Debug, Clone, Copy, Default)]
    pub struct HeuristicTextMeasure;

    impl TextMeasure for HeuristicTextMeasure {
        fn text_width(&self, label: &TextLabel) -> f64 {
            label.content.chars().count() as f64 * label.font_size * 0.6
        }
    }

    /// 按几何族划分的存储坐标。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Geometry {
        /// 起止点，顺序任意；区域类图元需经 min/max 规整后使用。
        Span { start: Point2, end: Point2 },
        Radial { center: Point2, radius: f64 },
        Anchor { position: Point2 },
    }

    impl Geometry {
        pub fn translate(&mut self, delta: Vector2) {
            match self {
                Geometry::Span { start, end } => {
                    *start = start.translate(delta);
                    *end = end.translate(delta);
                }
                Geometry::Radial { center, .. } => {
                    *center = center.translate(delta);
                }
                Geometry::Anchor { position } => {
                    *position = position.translate(delta);
                }
            }
        }

        fn is_finite(&self) -> bool {
            match self {
                Geometry::Span { start, end } => start.is_finite() && end.is_finite(),
                Geometry::Radial { center, radius } => center.is_finite() && radius.is_finite(),
                Geometry::Anchor { position } => position.is_finite(),
            }
        }
    }

    /// 创建图元时的尺寸下限。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct CreationLimits {
        pub min_area_size: f64,
        pub min_radius: f64,
    }

    impl Default for CreationLimits {
        fn default() -> Self {
            Self {
                min_area_size: 20.0,
                min_radius: 5.0,
            }
        }
    }

    /// 单个可绘制图元。
    ///
    /// 存储坐标始终位于图元自身的局部（未旋转）坐标系；`rotation` 作为视图变换，
    /// 由命中测试、控制柄与渲染统一绕 [`Shape::center`] 施加。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Shape {
        kind: ShapeKind,
        pub geometry: Geometry,
        pub rotation: f64,
        pub style: Style,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub label: Option<TextLabel>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub distance: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub door_width: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub door_height: Option<f64>,
    }

    impl Shape {
        /// 由工具拖拽手势创建图元。
        ///
        /// 区域类与树在拖拽不足最小尺寸时沿拖拽方向延伸终点（不缩小、不翻转）；
        /// 圆以起点为圆心、拖拽长度为半径；标注记录取整后的长度。
        /// 文字需要内容，请改用 [`Shape::text`]，此处返回 None。
        pub fn from_drag(
            kind: ShapeKind,
            start: Point2,
            end: Point2,
            style: Style,
            limits: &CreationLimits,
        ) -> Option<Self> {
            let geometry = match kind.family() {
                ShapeFamily::Segment => Geometry::Span { start, end },
                ShapeFamily::Area | ShapeFamily::Canopy => Geometry::Span {
                    start,
                    end: Point2::new(
                        extend_axis(start.x(), end.x(), limits.min_area_size),
                        extend_axis(start.y(), end.y(), limits.min_area_size),
                    ),
                },
                ShapeFamily::Radial => Geometry::Radial {
                    center: start,
                    radius: start.distance(end).max(limits.min_radius),
                },
                ShapeFamily::Anchor => return None,
            };
            let mut shape = Self::bare(kind, geometry, style);
            if kind == ShapeKind::Dimension {
                shape.distance = Some(start.distance(end).round());
            }
            Some(shape)
        }

        /// 线段族图元（用于擦除碎片与边分解）。
        pub fn segment(kind: ShapeKind, start: Point2, end: Point2, style: Style) -> Self {
            debug_assert_eq!(kind.family(), ShapeFamily::Segment);
            Self::bare(kind, Geometry::Span { start, end }, style)
        }

        pub fn circle(center: Point2, radius: f64, style: Style) -> Self {
            Self::bare(ShapeKind::Circle, Geometry::Radial { center, radius }, style)
        }

        pub fn text(position: Point2, label: TextLabel, style: Style) -> Self {
            let mut shape = Self::bare(ShapeKind::Text, Geometry::Anchor { position }, style);
            shape.label = Some(label);
            shape
        }

        /// 由外部数据组装图元；几何族不匹配或坐标非有限值时返回 None。文字内容由调用方另行设置。
        pub fn from_parts(kind: ShapeKind, geometry: Geometry, style: Style) -> Option<Self> {
            let fits = matches!(
                (kind.family(), &geometry),
                (
                    ShapeFamily::Segment | ShapeFamily::Area | ShapeFamily::Canopy,
                    Geometry::Span { .. }
                ) | (ShapeFamily::Radial, Geometry::Radial { .. })
                    | (ShapeFamily::Anchor, Geometry::Anchor { .. })
            );
            if !fits || !geometry.is_finite() {
                return None;
            }
            Some(Self::bare(kind, geometry, style))
        }

        fn bare(kind: ShapeKind, geometry: Geometry, style: Style) -> Self {
            Self {
                kind,
                geometry,
                rotation: 0.0,
                style,
                label: None,
                distance: None,
                door_width: None,
                door_height: None,
            }
        }

        #[inline]
        pub fn kind(&self) -> ShapeKind {
            self.kind
        }

        #[inline]
        pub fn family(&self) -> ShapeFamily {
            self.kind.family()
        }

        /// 所有旋转与控制柄计算的枢轴。每次调用都依据当前坐标重新计算。
        pub fn center(&self) -> Point2 {
            match &self.geometry {
                Geometry::Span { start, end } => start.midpoint(*end),
                Geometry::Radial { center, .. } => *center,
                Geometry::Anchor { position } => *position,
            }
        }

        /// 原始存储的起止点。
        pub fn span(&self) -> Option<(Point2, Point2)> {
            match &self.geometry {
                Geometry::Span { start, end } => Some((*start, *end)),
                _ => None,
            }
        }

        /// 区域类/树在局部坐标系下规整后的 (min, max)。门若带尺寸覆盖，则以中心与覆盖尺寸为准。
        pub fn local_box(&self) -> Option<(Point2, Point2)> {
            if !matches!(self.family(), ShapeFamily::Area | ShapeFamily::Canopy) {
                return None;
            }
            let (start, end) = self.span()?;
            if let (ShapeKind::Door, Some(width), Some(height)) =
                (self.kind, self.door_width, self.door_height)
            {
                let center = start.midpoint(end);
                let half = Vector2::new(width.abs() * 0.5, height.abs() * 0.5);
                return Some((
                    center.translate(half.scale(-1.0)),
                    center.translate(half),
                ));
            }
            let bounds = Bounds2D::from_corners(start, end);
            Some((bounds.min(), bounds.max()))
        }

        /// 写回局部包围盒。门的尺寸覆盖若存在则同步更新。
        pub fn set_local_box(&mut self, min: Point2, max: Point2) {
            if let Geometry::Span { start, end } = &mut self.geometry {
                *start = min;
                *end = max;
            }
            if self.kind == ShapeKind::Door && self.door_width.is_some() && self.door_height.is_some()
            {
                self.door_width = Some(max.x() - min.x());
                self.door_height = Some(max.y() - min.y());
            }
        }

        /// 线段族在世界坐标系下的端点。
        pub fn world_segment(&self) -> Option<(Point2, Point2)> {
            if self.family() != ShapeFamily::Segment {
                return None;
            }
            let (start, end) = self.span()?;
            Some((self.to_world(start), self.to_world(end)))
        }

        /// 区域类四角的世界坐标，顺序为 nw, ne, se, sw（局部 y 轴向下）。
        pub fn world_corners(&self) -> Option<[Point2; 4]> {
            if self.family() != ShapeFamily::Area {
                return None;
            }
            let (min, max) = self.local_box()?;
            Some([
                self.to_world(min),
                self.to_world(Point2::new(max.x(), min.y())),
                self.to_world(max),
                self.to_world(Point2::new(min.x(), max.y())),
            ])
        }

        /// 树冠：包围盒中心 + 较短边的一半。
        pub fn canopy(&self) -> Option<(Point2, f64)> {
            if self.kind != ShapeKind::Tree {
                return None;
            }
            let (min, max) = self.local_box()?;
            let radius = (max.x() - min.x()).min(max.y() - min.y()) * 0.5;
            Some((min.midpoint(max), radius))
        }

        /// 圆半径或树冠半径。
        pub fn radius(&self) -> Option<f64> {
            match &self.geometry {
                Geometry::Radial { radius, .. } => Some(*radius),
                Geometry::Span { .. } => self.canopy().map(|(_, radius)| radius),
                Geometry::Anchor { .. } => None,
            }
        }

        pub fn length(&self) -> Option<f64> {
            if self.family() != ShapeFamily::Segment {
                return None;
            }
            self.span().map(|(start, end)| start.distance(end))
        }

        #[inline]
        pub fn is_rotated(&self) -> bool {
            self.rotation != 0.0
        }

        pub fn set_rotation(&mut self, angle: f64) {
            self.rotation = if angle.is_finite() {
                normalize_angle(angle)
            } else {
                0.0
            };
        }

        /// 世界坐标 → 局部坐标（绕中心逆旋转）。
        pub fn to_local(&self, point: Point2) -> Point2 {
            if self.is_rotated() {
                point.rotate_about(self.center(), -self.rotation)
            } else {
                point
            }
        }

        /// 局部坐标 → 世界坐标。
        pub fn to_world(&self, point: Point2) -> Point2 {
            if self.is_rotated() {
                point.rotate_about(self.center(), self.rotation)
            } else {
                point
            }
        }

        #[inline]
        pub fn translate(&mut self, delta: Vector2) {
            self.geometry.translate(delta);
        }

        /// 文字在局部坐标系下的矩形（锚点为左上角，高度为字号）。
        pub fn text_box(&self, measure: &dyn TextMeasure) -> Option<(Point2, Point2)> {
            let Geometry::Anchor { position } = &self.geometry else {
                return None;
            };
            let label = self.label.as_ref()?;
            let width = measure.text_width(label).max(0.0);
            Some((
                *position,
                Point2::new(position.x() + width, position.y() + label.font_size),
            ))
        }

        pub fn bounds(&self) -> Bounds2D {
            self.bounds_with(&HeuristicTextMeasure)
        }

        /// 世界坐标下的轴对齐范围（已计入旋转）。
        pub fn bounds_with(&self, measure: &dyn TextMeasure) -> Bounds2D {
            let mut bounds = Bounds2D::empty();
            match &self.geometry {
                Geometry::Radial { center, radius } => {
                    let r = radius.abs();
                    bounds.include_point(Point2::new(center.x() - r, center.y() - r));
                    bounds.include_point(Point2::new(center.x() + r, center.y() + r));
                }
                Geometry::Span { start, end } => match self.family() {
                    ShapeFamily::Canopy => {
                        if let Some((center, r)) = self.canopy() {
                            bounds.include_point(Point2::new(center.x() - r, center.y() - r));
                            bounds.include_point(Point2::new(center.x() + r, center.y() + r));
                        }
                    }
                    ShapeFamily::Area => {
                        for corner in self.world_corners().unwrap_or([*start, *end, *start, *end]) {
                            bounds.include_point(corner);
                        }
                    }
                    _ => {
                        bounds.include_point(self.to_world(*start));
                        bounds.include_point(self.to_world(*end));
                    }
                },
                Geometry::Anchor { position } => {
                    if let Some((min, max)) = self.text_box(measure) {
                        for corner in [
                            min,
                            Point2::new(max.x(), min.y()),
                            max,
                            Point2::new(min.x(), max.y()),
                        ] {
                            bounds.include_point(self.to_world(corner));
                        }
                    } else {
                        bounds.include_point(*position);
                    }
                }
            }
            bounds
        }
    }

    fn extend_axis(start: f64, end: f64, minimum: f64) -> f64 {
        let delta = end - start;
        if delta.abs() >= minimum {
            end
        } else if delta < 0.0 {
            start - minimum
        } else {
            start + minimum
        }
    }

    /// 有序图元列表：插入顺序即绘制顺序（后者在上）。
    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Drawing {
        shapes: Vec<(ShapeId, Shape)>,
        next_shape_id: u64,
    }

    impl Drawing {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
            let id = self.allocate_id();
            self.shapes.push((id, shape));
            id
        }

        /// 分配一个新的标识，但不插入图元。
        pub fn allocate_id(&mut self) -> ShapeId {
            let id = self.next_shape_id;
            self.next_shape_id += 1;
            ShapeId(id)
        }

        #[inline]
        pub fn shapes(&self) -> impl Iterator<Item = &(ShapeId, Shape)> {
            self.shapes.iter()
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.shapes.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.shapes.is_empty()
        }

        #[inline]
        pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
            self.shapes
                .iter()
                .find_map(|(shape_id, shape)| (*shape_id == id).then_some(shape))
        }

        #[inline]
        pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
            self.shapes
                .iter_mut()
                .find_map(|(shape_id, shape)| (*shape_id == id).then_some(shape))
        }

        #[inline]
        pub fn position(&self, id: ShapeId) -> Option<usize> {
            self.shapes.iter().position(|(shape_id, _)| *shape_id == id)
        }

        #[inline]
        pub fn contains(&self, id: ShapeId) -> bool {
            self.position(id).is_some()
        }

        pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
            let index = self.position(id)?;
            Some(self.shapes.remove(index).1)
        }

        /// 原子地替换整个列表，标识计数器保持单调。
        pub fn replace_shapes(&mut self, shapes: Vec<(ShapeId, Shape)>) {
            if let Some(max) = shapes.iter().map(|(id, _)| id.get()).max() {
                self.next_shape_id = self.next_shape_id.max(max + 1);
            }
            self.shapes = shapes;
        }

        /// 用另一份快照恢复内容，但不回退标识计数器。
        pub fn restore_from(&mut self, snapshot: &Drawing) {
            self.shapes = snapshot.shapes.clone();
            self.next_shape_id = self.next_shape_id.max(snapshot.next_shape_id);
        }

        pub fn bring_to_front(&mut self, id: ShapeId) -> bool {
            let Some(index) = self.position(id) else {
                return false;
            };
            let entry = self.shapes.remove(index);
            self.shapes.push(entry);
            true
        }

        pub fn send_to_back(&mut self, id: ShapeId) -> bool {
            let Some(index) = self.position(id) else {
                return false;
            };
            let entry = self.shapes.remove(index);
            self.shapes.insert(0, entry);
            true
        }

        pub fn clear(&mut self) {
            self.shapes.clear();
        }

        /// 从上到下（逆绘制顺序）查找第一个满足条件的图元。
        pub fn topmost<F>(&self, mut predicate: F) -> Option<ShapeId>
        where
            F: FnMut(&Shape) -> bool,
        {
            self.shapes
                .iter()
                .rev()
                .find_map(|(id, shape)| predicate(shape).then_some(*id))
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            let mut has = false;
            for (_, shape) in &self.shapes {
                let shape_bounds = shape.bounds();
                if !shape_bounds.is_empty() {
                    bounds.include_bounds(&shape_bounds);
                    has = true;
                }
            }
            if has { Some(bounds) } else { None }
        }
    }

    /// 角度差（模 2π）是否在容差内，测试与断言使用。
    pub fn angles_close(a: f64, b: f64, tolerance: f64) -> bool {
        let diff = normalize_angle(a - b);
        diff <= tolerance || TAU - diff <= tolerance
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::f64::consts::FRAC_PI_2;

        fn drag(kind: ShapeKind, start: (f64, f64), end: (f64, f64)) -> Shape {
            Shape::from_drag(
                kind,
                Point2::new(start.0, start.1),
                Point2::new(end.0, end.1),
                Style::default(),
                &CreationLimits::default(),
            )
            .expect("drag-created shape")
        }

        #[test]
        fn rectangle_drag_keeps_large_extent() {
            let shape = drag(ShapeKind::Rectangle, (10.0, 10.0), (100.0, 80.0));
            let (min, max) = shape.local_box().unwrap();
            assert!((max.x() - min.x() - 90.0).abs() < 1e-9);
            assert!((max.y() - min.y() - 70.0).abs() < 1e-9);
            assert_eq!(shape.rotation, 0.0);
        }

        #[test]
        fn small_drag_is_extended_along_its_sign() {
            let shape = drag(ShapeKind::Furniture, (50.0, 50.0), (45.0, 58.0));
            let (start, end) = shape.span().unwrap();
            assert_eq!(start, Point2::new(50.0, 50.0));
            assert_eq!(end, Point2::new(30.0, 70.0));

            let zero = drag(ShapeKind::Kitchen, (0.0, 0.0), (0.0, 0.0));
            let (min, max) = zero.local_box().unwrap();
            assert!((max.x() - min.x() - 20.0).abs() < 1e-9);
            assert!((max.y() - min.y() - 20.0).abs() < 1e-9);
        }

        #[test]
        fn circle_radius_is_drag_length_with_floor() {
            let circle = drag(ShapeKind::Circle, (0.0, 0.0), (30.0, 40.0));
            assert_eq!(circle.radius(), Some(50.0));
            assert_eq!(circle.center(), Point2::new(0.0, 0.0));
            let tiny = drag(ShapeKind::Circle, (0.0, 0.0), (1.0, 0.0));
            assert_eq!(tiny.radius(), Some(5.0));
        }

        #[test]
        fn dimension_records_rounded_distance() {
            let dim = drag(ShapeKind::Dimension, (0.0, 0.0), (30.2, 40.1));
            assert_eq!(dim.distance, Some(50.0));
        }

        #[test]
        fn text_needs_explicit_constructor() {
            let result = Shape::from_drag(
                ShapeKind::Text,
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 1.0),
                Style::default(),
                &CreationLimits::default(),
            );
            assert!(result.is_none());
        }

        #[test]
        fn rotated_area_corners_and_bounds() {
            let mut shape = drag(ShapeKind::Rectangle, (0.0, 0.0), (40.0, 20.0));
            shape.set_rotation(FRAC_PI_2);
            let corners = shape.world_corners().unwrap();
            // 中心 (20, 10)，旋转 90° 后宽高互换。
            assert!((corners[0].x() - 30.0).abs() < 1e-9);
            assert!((corners[0].y() - (-10.0)).abs() < 1e-9);
            let bounds = shape.bounds();
            assert!((bounds.width() - 20.0).abs() < 1e-9);
            assert!((bounds.height() - 40.0).abs() < 1e-9);
        }

        #[test]
        fn door_size_override_defines_box() {
            let mut door = drag(ShapeKind::Door, (0.0, 0.0), (40.0, 20.0));
            door.door_width = Some(80.0);
            door.door_height = Some(15.0);
            let (min, max) = door.local_box().unwrap();
            assert!((min.x() - (-20.0)).abs() < 1e-9);
            assert!((max.y() - 17.5).abs() < 1e-9);

            door.set_local_box(Point2::new(0.0, 0.0), Point2::new(50.0, 30.0));
            assert_eq!(door.door_width, Some(50.0));
            assert_eq!(door.door_height, Some(30.0));
        }

        #[test]
        fn canopy_uses_shorter_side() {
            let tree = drag(ShapeKind::Tree, (0.0, 0.0), (60.0, 40.0));
            let (center, radius) = tree.canopy().unwrap();
            assert_eq!(center, Point2::new(30.0, 20.0));
            assert!((radius - 20.0).abs() < 1e-9);
        }

        #[test]
        fn from_parts_rejects_family_mismatch() {
            let bad = Shape::from_parts(
                ShapeKind::Circle,
                Geometry::Span {
                    start: Point2::new(0.0, 0.0),
                    end: Point2::new(1.0, 1.0),
                },
                Style::default(),
            );
            assert!(bad.is_none());
            let nan = Shape::from_parts(
                ShapeKind::Wall,
                Geometry::Span {
                    start: Point2::new(f64::NAN, 0.0),
                    end: Point2::new(1.0, 1.0),
                },
                Style::default(),
            );
            assert!(nan.is_none());
        }

        #[test]
        fn drawing_orders_and_removes_by_identity() {
            let mut drawing = Drawing::new();
            let a = drawing.add_shape(drag(ShapeKind::Wall, (0.0, 0.0), (10.0, 0.0)));
            let b = drawing.add_shape(drag(ShapeKind::Wall, (0.0, 0.0), (10.0, 0.0)));
            let c = drawing.add_shape(drag(ShapeKind::Circle, (0.0, 0.0), (10.0, 0.0)));
            assert_ne!(a, b);
            assert_eq!(drawing.len(), 3);

            assert!(drawing.send_to_back(c));
            assert_eq!(drawing.position(c), Some(0));
            assert!(drawing.bring_to_front(a));
            assert_eq!(drawing.position(a), Some(2));

            let removed = drawing.remove(b).expect("remove b");
            assert_eq!(removed.kind(), ShapeKind::Wall);
            assert!(drawing.contains(a));
            assert!(!drawing.contains(b));
            assert_eq!(drawing.topmost(|shape| shape.kind() == ShapeKind::Wall), Some(a));
        }

        #[test]
        fn restore_keeps_identifier_counter_monotonic() {
            let mut drawing = Drawing::new();
            drawing.add_shape(drag(ShapeKind::Line, (0.0, 0.0), (10.0, 0.0)));
            let snapshot = drawing.clone();
            drawing.add_shape(drag(ShapeKind::Line, (0.0, 0.0), (10.0, 0.0)));
            drawing.restore_from(&snapshot);
            assert_eq!(drawing.len(), 1);
            let next = drawing.add_shape(drag(ShapeKind::Line, (0.0, 0.0), (5.0, 0.0)));
            assert_eq!(next.get(), 2);
        }

        #[test]
        fn angles_close_handles_wraparound() {
            assert!(angles_close(0.0, TAU - 1e-12, 1e-9));
            assert!(!angles_close(0.0, 0.1, 1e-9));
        }
    }
}
