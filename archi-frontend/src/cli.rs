use std::collections::BTreeMap;
use std::path::PathBuf;

use archi_config::AppConfig;
use archi_core::geometry::{Point2, Vector2};
use archi_core::kind::ShapeFamily;
use archi_core::shape::Shape;
use archi_engine::command::{CommandBus, CommandContext, CommandRequest};
use archi_engine::editor::{Editor, Tool};
use archi_io::{DocumentSaver, JsonFacade, SnapshotMeta};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{DocumentSource, LoadedPlan, load_plan};
use crate::render::{DrawList, format_vec, paint_editor};

/// 命令行参数中与会话相关的部分。
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub open: Option<PathBuf>,
    pub save: Option<PathBuf>,
}

/// 简易 CLI 演示：加载快照或内置示例，回放一段脚本化的编辑会话并打印概览。
pub fn run_demo(config: &AppConfig, options: &CliOptions) -> Result<(), FrontendError> {
    let LoadedPlan {
        mut editor,
        source,
        meta,
        report,
        ..
    } = load_plan(options.open.as_deref(), config);

    println!("Archi 平面草图编辑器 CLI 演示");
    match &source {
        DocumentSource::Json(path) => println!("已从 JSON 快照加载：{}", path.display()),
        DocumentSource::Demo => println!("已构建内置示例平面图"),
    }
    if let Some(report) = &report {
        for skipped in &report.skipped {
            println!("  - 跳过第 {} 条记录（未知种类 `{}`）", skipped.index, skipped.kind);
        }
    }

    for step in run_script(&mut editor) {
        println!("[脚本] {step}");
    }
    print_summary(&editor);

    if let Some(path) = &options.save {
        let meta = SnapshotMeta {
            zoom: Some(editor.zoom()),
            ..meta
        };
        JsonFacade::new().save(editor.drawing(), &meta, path)?;
        println!("已保存快照：{}", path.display());
    }
    Ok(())
}

/// 回放固定脚本：拖动一段墙、把第一个区域图元旋转 90°、擦断一段墙，再撤销擦除。
/// 返回每一步的描述。
pub fn run_script(editor: &mut Editor) -> Vec<String> {
    let bus = CommandBus::new();
    let mut steps = Vec::new();

    editor.set_tool(Tool::Select);
    if let Some(point) = segment_point(editor, 0.25) {
        editor.pointer_down(point);
        if let Some(id) = editor.selected() {
            let target = point.translate(Vector2::new(0.0, 10.0));
            editor.pointer_move(target);
            editor.pointer_up(target);
            steps.push(format!("拖动图元 #{} 到 {}", id.get(), format_vec(target.as_vec2())));
        }
    }

    let area = editor
        .drawing()
        .shapes()
        .find(|(_, shape)| shape.family() == ShapeFamily::Area)
        .map(|(id, _)| *id);
    if let Some(id) = area {
        if editor.select(id).is_ok() {
            steps.push(dispatch(&bus, editor, "rotate_90"));
        }
    }

    if let Some(point) = segment_point(editor, 0.75) {
        let before = editor.drawing().len();
        editor.set_tool(Tool::Erase);
        editor.pointer_down(point);
        editor.pointer_up(point);
        steps.push(format!(
            "在 {} 擦除：图元数 {} → {}",
            format_vec(point.as_vec2()),
            before,
            editor.drawing().len()
        ));
        steps.push(dispatch(&bus, editor, "undo"));
    }

    editor.set_tool(Tool::Select);
    steps
}

fn dispatch(bus: &CommandBus, editor: &mut Editor, name: &str) -> String {
    let mut context = CommandContext { editor };
    let response = bus.dispatch(&CommandRequest::named(name), &mut context);
    let message = response.message.unwrap_or_default();
    if response.success {
        format!("{name}: {message}")
    } else {
        warn!(command = name, %message, "CLI 命令执行失败");
        format!("{name} 失败: {message}")
    }
}

/// 第一个线段族图元上按比例取的世界坐标点。
fn segment_point(editor: &Editor, fraction: f64) -> Option<Point2> {
    let (start, end) = editor
        .drawing()
        .shapes()
        .find_map(|(_, shape)| shape.world_segment())?;
    Some(start.translate(start.vector_to(end).scale(fraction)))
}

fn print_summary(editor: &Editor) {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for (_, shape) in editor.drawing().shapes() {
        *counts.entry(shape.kind().name()).or_default() += 1;
    }
    info!(shapes = editor.drawing().len(), kinds = counts.len(), "CLI 演示图元统计");

    println!("图元总数：{}", editor.drawing().len());
    for (kind, count) in &counts {
        println!("  - {kind}: {count}");
    }

    match editor.selected_shape() {
        Some(shape) => println!("当前选中：{}", describe_shape(shape)),
        None => println!("当前尚未选中任何图元。"),
    }

    let history = editor.history();
    println!(
        "历史：{} 条快照，游标 {}，可撤销={}，可重做={}",
        history.len(),
        history.cursor(),
        history.can_undo(),
        history.can_redo()
    );

    let viewport = editor.viewport();
    println!(
        "视口中心={}, 缩放={:.3}",
        format_vec(viewport.center.as_vec2()),
        viewport.zoom
    );
    if let Some(bounds) = editor.fit_bounds() {
        println!(
            "图纸范围：{} - {}",
            format_vec(bounds.min().as_vec2()),
            format_vec(bounds.max().as_vec2())
        );
    }

    let mut list = DrawList::new();
    paint_editor(editor, &mut list);
    println!("绘制命令数：{}", list.commands().len());

    let mut commands: Vec<&str> = CommandBus::new().available_commands().copied().collect();
    commands.sort_unstable();
    println!("支持的命令: {}", commands.join(", "));
}

fn describe_shape(shape: &Shape) -> String {
    format!(
        "{} 中心={} 旋转={:.1}°",
        shape.kind(),
        format_vec(shape.center().as_vec2()),
        shape.rotation.to_degrees()
    )
}
