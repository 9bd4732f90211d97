use std::env;
use std::path::{Path, PathBuf};

use archi_config::AppConfig;
use archi_core::geometry::Point2;
use archi_core::kind::{CapabilityTable, ErasePolicy, ShapeKind};
use archi_core::shape::{ShapeId, Style};
use archi_engine::editor::Editor;
use archi_engine::settings::EditorSettings;
use archi_io::{DocumentLoader, JsonFacade, LoadReport, SnapshotMeta};
use tracing::{info, warn};

pub const SAMPLE_ENV_VAR: &str = "ARCHI_CLI_SAMPLE_JSON";

/// 文档来源，便于前端呈现加载信息。
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Json(PathBuf),
    Demo,
}

/// 内置示例平面图中的关键图元。
#[derive(Debug, Clone, Copy)]
pub struct DemoPlan {
    pub north_wall: ShapeId,
    pub east_wall: ShapeId,
    pub door: ShapeId,
    pub kitchen: ShapeId,
    pub column: ShapeId,
    pub tree: ShapeId,
    pub label: ShapeId,
}

/// 统一封装加载后的编辑器与元信息。
#[derive(Debug)]
pub struct LoadedPlan {
    pub editor: Editor,
    pub source: DocumentSource,
    pub meta: SnapshotMeta,
    pub report: Option<LoadReport>,
    pub demo: Option<DemoPlan>,
}

/// 配置 → 编辑器参数。擦除策略覆盖中无法识别或与几何族不符的种类会被忽略并告警。
pub fn editor_settings_from_config(config: &AppConfig) -> EditorSettings {
    let editor = &config.editor;
    let mut capabilities = CapabilityTable::new();
    let overrides = config
        .eraser
        .atomic_kinds
        .iter()
        .map(|name| (name, ErasePolicy::Atomic))
        .chain(
            config
                .eraser
                .decompose_kinds
                .iter()
                .map(|name| (name, ErasePolicy::Decompose)),
        );
    for (name, policy) in overrides {
        match ShapeKind::from_name(name) {
            Some(kind) => {
                if !capabilities.set_erase_policy(kind, policy) {
                    warn!(kind = %kind, ?policy, "擦除策略与图元几何不符，已忽略");
                }
            }
            None => warn!(name = %name, "未知的图元种类，已忽略"),
        }
    }

    EditorSettings {
        history_limit: editor.history_limit,
        eraser_diameter: editor.eraser_diameter,
        min_area_size: editor.min_area_size,
        min_resize_size: editor.min_resize_size,
        min_radius: editor.min_radius,
        min_fragment_length: editor.min_fragment_length,
        erase_wedge_degrees: editor.erase_wedge_degrees,
        arc_segments: editor.arc_segments,
        line_hit_threshold: editor.line_hit_threshold,
        dimension_hit_threshold: editor.dimension_hit_threshold,
        handle_size: editor.handle_size,
        handle_tolerance: editor.handle_tolerance,
        rotation_handle_distance: editor.rotation_handle_distance,
        paste_offset: editor.paste_offset,
        text_erase_width: editor.text_erase_width,
        grid_size: editor.grid_size,
        snap_to_grid: editor.snap_to_grid,
        capabilities,
    }
}

/// 依次尝试显式路径、环境变量 `ARCHI_CLI_SAMPLE_JSON` 指定的快照，失败则回退到内置示例。
pub fn load_plan(open: Option<&Path>, config: &AppConfig) -> LoadedPlan {
    let settings = editor_settings_from_config(config);
    let default_meta = SnapshotMeta {
        canvas_width: config.canvas.width,
        canvas_height: config.canvas.height,
        ..SnapshotMeta::default()
    };

    let candidate = open
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(SAMPLE_ENV_VAR).map(PathBuf::from));
    if let Some(path) = candidate {
        match JsonFacade::new().load(&path) {
            Ok(loaded) => {
                info!(path = %path.display(), "从 JSON 快照加载平面图成功");
                let mut editor = Editor::new(settings);
                editor.load_drawing(loaded.drawing);
                if let Some(zoom) = loaded.meta.zoom {
                    editor.set_zoom(zoom);
                }
                return LoadedPlan {
                    editor,
                    source: DocumentSource::Json(path),
                    meta: loaded.meta,
                    report: Some(loaded.report),
                    demo: None,
                };
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载快照失败，回退到内置示例");
            }
        }
    }

    let mut editor = Editor::new(settings);
    let demo = populate_demo(&mut editor);
    LoadedPlan {
        editor,
        source: DocumentSource::Demo,
        meta: default_meta,
        report: None,
        demo,
    }
}

/// 构建一个小户型示例：四面墙、门窗、厨房、柱、树、尺寸标注与房间名。
pub fn populate_demo(editor: &mut Editor) -> Option<DemoPlan> {
    let wall_style = Style {
        stroke_width: 8.0,
        ..Style::default()
    };
    editor.set_style(wall_style);
    let wall = |editor: &mut Editor, from: (f64, f64), to: (f64, f64)| {
        editor.create_shape(
            ShapeKind::Wall,
            Point2::new(from.0, from.1),
            Point2::new(to.0, to.1),
        )
    };
    let north_wall = wall(editor, (0.0, 0.0), (400.0, 0.0))?;
    let east_wall = wall(editor, (400.0, 0.0), (400.0, 300.0))?;
    wall(editor, (400.0, 300.0), (0.0, 300.0))?;
    wall(editor, (0.0, 300.0), (0.0, 0.0))?;

    editor.set_style(Style::default());
    let area = |editor: &mut Editor, kind, from: (f64, f64), to: (f64, f64)| {
        editor.create_shape(kind, Point2::new(from.0, from.1), Point2::new(to.0, to.1))
    };
    let door = area(editor, ShapeKind::Door, (160.0, -7.5), (240.0, 7.5))?;
    area(editor, ShapeKind::Window, (390.0, 100.0), (410.0, 180.0))?;
    let kitchen = area(editor, ShapeKind::Kitchen, (20.0, 20.0), (140.0, 80.0))?;
    let column = area(editor, ShapeKind::Column, (190.0, 140.0), (210.0, 160.0))?;
    let tree = area(editor, ShapeKind::Tree, (440.0, 20.0), (500.0, 80.0))?;
    area(editor, ShapeKind::Dimension, (0.0, -40.0), (400.0, -40.0))?;
    let label = editor.add_text(Point2::new(250.0, 220.0), "Séjour").ok()?;

    // 示例作为历史起点，撤销不会拆掉它。
    editor.clear_selection();
    editor.reset_history();
    info!(shapes = editor.drawing().len(), "已创建示例平面图");
    Some(DemoPlan {
        north_wall,
        east_wall,
        door,
        kitchen,
        column,
        tree,
        label,
    })
}
