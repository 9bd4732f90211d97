use std::fs;
use std::path::{Path, PathBuf};

use archi_core::geometry::Point2;
use archi_core::kind::{ShapeFamily, ShapeKind};
use archi_core::shape::{Drawing, Geometry, Shape, Style, TextLabel};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_CANVAS_WIDTH: f64 = 1200.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 800.0;
const DEFAULT_FONT_FAMILY: &str = "Arial";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("shape #{index} ({kind}) is missing field `{field}`")]
    MissingField {
        index: usize,
        kind: String,
        field: &'static str,
    },
    #[error("shape #{index} has invalid `{field}`: {reason}")]
    InvalidValue {
        index: usize,
        field: &'static str,
        reason: String,
    },
}

/// 快照中与图元列表并列保存的画布信息。
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotMeta {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub zoom: Option<f64>,
    /// 界面层的设置原样透传。
    pub settings: Option<serde_json::Value>,
}

impl Default for SnapshotMeta {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            zoom: None,
            settings: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub kind: String,
}

/// 加载统计：成功载入的图元数量与被跳过的未知种类记录。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub drawing: Drawing,
    pub meta: SnapshotMeta,
    pub report: LoadReport,
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<LoadedSnapshot, IoError>;
}

pub trait DocumentSaver {
    fn save(&self, drawing: &Drawing, meta: &SnapshotMeta, path: &Path) -> Result<(), IoError>;
}

/// JSON 快照的读写入口。
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFacade {
    pretty: bool,
}

impl JsonFacade {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl DocumentLoader for JsonFacade {
    fn load(&self, path: &Path) -> Result<LoadedSnapshot, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let loaded = parse_snapshot(&data)?;
        info!(
            path = %path.display(),
            shapes = loaded.report.loaded,
            skipped = loaded.report.skipped.len(),
            "已读取快照"
        );
        Ok(loaded)
    }
}

impl DocumentSaver for JsonFacade {
    fn save(&self, drawing: &Drawing, meta: &SnapshotMeta, path: &Path) -> Result<(), IoError> {
        let data = encode_snapshot(drawing, meta, self.pretty)?;
        fs::write(path, data).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), shapes = drawing.len(), "已保存快照");
        Ok(())
    }
}

/// 快照文件的顶层结构。读取时记录保持为原始 JSON，先按种类筛选再逐条解析。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile<R> {
    #[serde(default)]
    shapes: Vec<R>,
    #[serde(default = "default_canvas_width")]
    canvas_width: f64,
    #[serde(default = "default_canvas_height")]
    canvas_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settings: Option<serde_json::Value>,
}

fn default_canvas_width() -> f64 {
    DEFAULT_CANVAS_WIDTH
}

fn default_canvas_height() -> f64 {
    DEFAULT_CANVAS_HEIGHT
}

/// 单条图元记录的线格式。种类保留为字符串，以便跳过未知种类而不是整体失败。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeRecord {
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door_height: Option<f64>,
}

impl ShapeRecord {
    pub fn from_shape(shape: &Shape) -> Self {
        let mut record = Self {
            kind: shape.kind().name().to_string(),
            rotation: Some(shape.rotation),
            stroke_color: Some(shape.style.stroke_color.clone()),
            stroke_width: Some(shape.style.stroke_width),
            fill_color: Some(shape.style.fill_color.clone()),
            fill: Some(shape.style.fill),
            distance: shape.distance,
            door_width: shape.door_width,
            door_height: shape.door_height,
            ..Self::default()
        };
        match &shape.geometry {
            Geometry::Span { start, end } => {
                record.start_x = Some(start.x());
                record.start_y = Some(start.y());
                record.end_x = Some(end.x());
                record.end_y = Some(end.y());
            }
            Geometry::Radial { center, radius } => {
                record.start_x = Some(center.x());
                record.start_y = Some(center.y());
                record.radius = Some(*radius);
            }
            Geometry::Anchor { position } => {
                record.x = Some(position.x());
                record.y = Some(position.y());
            }
        }
        if let Some(label) = &shape.label {
            record.text = Some(label.content.clone());
            record.font_size = Some(label.font_size);
            record.font_family = Some(label.font_family.clone());
        }
        record
    }

    /// 转换为图元。未知种类返回 `Ok(None)`；已知种类缺少必需字段时报错。
    pub fn to_shape(&self, index: usize) -> Result<Option<Shape>, IoError> {
        let Some(kind) = ShapeKind::from_name(&self.kind) else {
            return Ok(None);
        };
        let required = |value: Option<f64>, field: &'static str| -> Result<f64, IoError> {
            let value = value.ok_or_else(|| IoError::MissingField {
                index,
                kind: kind.name().to_string(),
                field,
            })?;
            finite(value, index, field)
        };

        let geometry = match kind.family() {
            ShapeFamily::Segment | ShapeFamily::Area | ShapeFamily::Canopy => Geometry::Span {
                start: Point2::new(
                    required(self.start_x, "startX")?,
                    required(self.start_y, "startY")?,
                ),
                end: Point2::new(required(self.end_x, "endX")?, required(self.end_y, "endY")?),
            },
            ShapeFamily::Radial => {
                let radius = required(self.radius, "radius")?;
                if radius <= 0.0 {
                    return Err(IoError::InvalidValue {
                        index,
                        field: "radius",
                        reason: format!("must be positive, got {radius}"),
                    });
                }
                Geometry::Radial {
                    center: Point2::new(
                        required(self.start_x, "startX")?,
                        required(self.start_y, "startY")?,
                    ),
                    radius,
                }
            }
            ShapeFamily::Anchor => Geometry::Anchor {
                position: Point2::new(required(self.x, "x")?, required(self.y, "y")?),
            },
        };

        let defaults = Style::default();
        let style = Style {
            stroke_color: self.stroke_color.clone().unwrap_or(defaults.stroke_color),
            stroke_width: match self.stroke_width {
                Some(width) => finite(width, index, "strokeWidth")?,
                None => defaults.stroke_width,
            },
            fill_color: self.fill_color.clone().unwrap_or(defaults.fill_color),
            fill: self.fill.unwrap_or(false),
        };

        let Some(mut shape) = Shape::from_parts(kind, geometry, style) else {
            return Err(IoError::InvalidValue {
                index,
                field: "type",
                reason: format!("geometry does not fit kind `{kind}`"),
            });
        };
        let rotation = match self.rotation {
            Some(angle) => finite(angle, index, "rotation")?,
            None => 0.0,
        };
        shape.set_rotation(rotation);
        shape.distance = self.distance;
        shape.door_width = self.door_width;
        shape.door_height = self.door_height;

        if kind == ShapeKind::Text {
            let content = self.text.clone().ok_or_else(|| IoError::MissingField {
                index,
                kind: kind.name().to_string(),
                field: "text",
            })?;
            let font_size = required(self.font_size, "fontSize")?;
            if font_size <= 0.0 {
                return Err(IoError::InvalidValue {
                    index,
                    field: "fontSize",
                    reason: format!("must be positive, got {font_size}"),
                });
            }
            let family = self
                .font_family
                .clone()
                .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string());
            shape.label = Some(TextLabel::new(content, font_size, family));
        }
        Ok(Some(shape))
    }
}

fn finite(value: f64, index: usize, field: &'static str) -> Result<f64, IoError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(IoError::InvalidValue {
            index,
            field,
            reason: format!("non-finite value {value}"),
        })
    }
}

/// 记录的种类名，兼容 `type` 与旧的 `kind` 字段。
fn record_kind(index: usize, value: &serde_json::Value) -> Result<&str, IoError> {
    value
        .get("type")
        .or_else(|| value.get("kind"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| IoError::MissingField {
            index,
            kind: "?".to_string(),
            field: "type",
        })
}

/// 解析快照文本。未知种类的记录在字段解析之前即被跳过并记入报告，
/// 因此其字段形状不影响其余记录。
pub fn parse_snapshot(data: &str) -> Result<LoadedSnapshot, IoError> {
    let file: SnapshotFile<serde_json::Value> =
        serde_json::from_str(data).map_err(IoError::Parse)?;
    let mut drawing = Drawing::new();
    let mut report = LoadReport::default();
    for (index, value) in file.shapes.into_iter().enumerate() {
        let kind = record_kind(index, &value)?;
        if ShapeKind::from_name(kind).is_none() {
            warn!(index, kind, "跳过未知种类的图元");
            report.skipped.push(SkippedRecord {
                index,
                kind: kind.to_string(),
            });
            continue;
        }
        let record: ShapeRecord =
            serde_json::from_value(value).map_err(|err| IoError::InvalidValue {
                index,
                field: "record",
                reason: err.to_string(),
            })?;
        if let Some(shape) = record.to_shape(index)? {
            drawing.add_shape(shape);
            report.loaded += 1;
        }
    }
    let meta = SnapshotMeta {
        canvas_width: file.canvas_width,
        canvas_height: file.canvas_height,
        zoom: file.zoom,
        settings: file.settings,
    };
    Ok(LoadedSnapshot {
        drawing,
        meta,
        report,
    })
}

pub fn encode_snapshot(
    drawing: &Drawing,
    meta: &SnapshotMeta,
    pretty: bool,
) -> Result<String, IoError> {
    let file: SnapshotFile<ShapeRecord> = SnapshotFile {
        shapes: drawing
            .shapes()
            .map(|(_, shape)| ShapeRecord::from_shape(shape))
            .collect(),
        canvas_width: meta.canvas_width,
        canvas_height: meta.canvas_height,
        zoom: meta.zoom,
        settings: meta.settings.clone(),
    };
    let encoded = if pretty {
        serde_json::to_string_pretty(&file)
    } else {
        serde_json::to_string(&file)
    };
    encoded.map_err(IoError::Encode)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Result<LoadedSnapshot, IoError> {
        parse_snapshot(&value.to_string())
    }

    #[test]
    fn legacy_record_defaults_rotation_and_fill() {
        let loaded = parse(json!({
            "shapes": [
                { "type": "wall", "startX": 0, "startY": 0, "endX": 100, "endY": 0, "strokeColor": "#333" }
            ]
        }))
        .expect("load");
        let (_, wall) = loaded.drawing.shapes().next().unwrap();
        assert_eq!(wall.kind(), ShapeKind::Wall);
        assert_eq!(wall.rotation, 0.0);
        assert!(!wall.style.fill);
        assert_eq!(wall.style.stroke_color, "#333");
        assert_eq!(loaded.meta.canvas_width, DEFAULT_CANVAS_WIDTH);
    }

    #[test]
    fn aliases_load_and_save_canonically() {
        let loaded = parse(json!({
            "shapes": [
                { "type": "poteau", "startX": 0, "startY": 0, "endX": 20, "endY": 20 },
                { "kind": "gaine", "startX": 0, "startY": 0, "endX": 40, "endY": 20 }
            ]
        }))
        .expect("load");
        let kinds: Vec<_> = loaded.drawing.shapes().map(|(_, s)| s.kind()).collect();
        assert_eq!(kinds, [ShapeKind::Column, ShapeKind::Duct]);

        let encoded = encode_snapshot(&loaded.drawing, &loaded.meta, false).unwrap();
        assert!(encoded.contains("\"type\":\"column\""));
        assert!(encoded.contains("\"type\":\"duct\""));
    }

    #[test]
    fn unknown_kind_is_skipped_and_reported() {
        let loaded = parse(json!({
            "shapes": [
                { "type": "hexagon", "startX": 0 },
                { "type": "circle", "startX": 5, "startY": 5, "radius": 3 }
            ]
        }))
        .expect("load");
        assert_eq!(loaded.report.loaded, 1);
        assert_eq!(
            loaded.report.skipped,
            vec![SkippedRecord {
                index: 0,
                kind: "hexagon".to_string()
            }]
        );
    }

    #[test]
    fn missing_numeric_field_fails_load() {
        let err = parse(json!({
            "shapes": [
                { "type": "line", "startX": 0, "startY": 0, "endX": 10, "endY": 0 },
                { "type": "rectangle", "startX": 0, "startY": 0, "endX": 10 }
            ]
        }))
        .unwrap_err();
        match err {
            IoError::MissingField { index, kind, field } => {
                assert_eq!(index, 1);
                assert_eq!(kind, "rectangle");
                assert_eq!(field, "endY");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse(json!({
            "shapes": [{ "type": "circle", "startX": 0, "startY": 0, "radius": 0 }]
        }))
        .unwrap_err();
        assert!(matches!(err, IoError::InvalidValue { field: "radius", .. }));

        let err = parse(json!({
            "shapes": [{ "type": "text", "x": 0, "y": 0, "fontSize": 12 }]
        }))
        .unwrap_err();
        assert!(matches!(err, IoError::MissingField { field: "text", .. }));
    }

    #[test]
    fn null_rotation_falls_back_to_zero() {
        let loaded = parse(json!({
            "shapes": [
                { "type": "wall", "startX": 0, "startY": 0, "endX": 100, "endY": 0,
                  "rotation": null, "fill": null }
            ]
        }))
        .expect("load");
        let (_, wall) = loaded.drawing.shapes().next().unwrap();
        assert_eq!(wall.rotation, 0.0);
        assert!(!wall.style.fill);
    }

    #[test]
    fn mistyped_field_of_known_kind_reports_index() {
        let err = parse(json!({
            "shapes": [
                { "type": "line", "startX": 0, "startY": 0, "endX": 10, "endY": 0 },
                { "type": "wall", "startX": "left", "startY": 0, "endX": 10, "endY": 0 }
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, IoError::InvalidValue { index: 1, field: "record", .. }));

        let err = parse(json!({ "shapes": [{ "startX": 0 }] })).unwrap_err();
        assert!(matches!(err, IoError::MissingField { index: 0, field: "type", .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_snapshot("{ \"shapes\": [").unwrap_err();
        assert!(matches!(err, IoError::Parse(_)));
    }

    #[test]
    fn record_round_trip_keeps_extras() {
        let mut door = Shape::from_parts(
            ShapeKind::Door,
            Geometry::Span {
                start: Point2::new(0.0, 0.0),
                end: Point2::new(80.0, 15.0),
            },
            Style::default(),
        )
        .unwrap();
        door.door_width = Some(80.0);
        door.door_height = Some(15.0);
        door.set_rotation(1.5);

        let record = ShapeRecord::from_shape(&door);
        assert_eq!(record.kind, "door");
        let restored = record.to_shape(0).unwrap().unwrap();
        assert_eq!(restored, door);
    }
}
