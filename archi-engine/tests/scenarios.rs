use std::f64::consts::TAU;

use archi_core::geometry::{Point2, Vector2};
use archi_core::kind::{CapabilityTable, ShapeKind};
use archi_core::shape::{CreationLimits, Shape, Style, angles_close};
use archi_engine::editor::{Editor, Tool};
use archi_engine::erase::{EraseOutcome, EraseParams, erase_partial};
use archi_engine::settings::EditorSettings;
use archi_engine::transform::{move_shape, rotate_shape};

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
fn create_then_move_rectangle() {
    let mut shape = drag(ShapeKind::Rectangle, (10.0, 10.0), (100.0, 80.0));
    let (min, max) = shape.local_box().unwrap();
    assert!((max.x() - min.x() - 90.0).abs() < 1e-9);
    assert!((max.y() - min.y() - 70.0).abs() < 1e-9);

    move_shape(&mut shape, Vector2::new(5.0, -5.0));
    let (start, end) = shape.span().unwrap();
    assert_eq!(start, Point2::new(15.0, 5.0));
    assert_eq!(end, Point2::new(105.0, 75.0));
}

#[test]
fn rotation_round_trip_for_every_kind() {
    let pivot = Point2::new(123.0, -45.0);
    for kind in ShapeKind::ALL {
        if kind == ShapeKind::Text {
            continue;
        }
        let original = drag(kind, (0.0, 0.0), (80.0, 30.0));
        let mut shape = original.clone();
        rotate_shape(&mut shape, 2.3, pivot);
        rotate_shape(&mut shape, -2.3, pivot);
        assert!(shape.center().distance(original.center()) < 1e-9, "{kind}");
        assert!(angles_close(shape.rotation, original.rotation, 1e-9), "{kind}");
    }
}

#[test]
fn decomposed_rotation_has_no_drift() {
    let pivot = Point2::new(-20.0, 35.0);
    let mut base = drag(ShapeKind::Stairs, (40.0, 40.0), (90.0, 70.0));
    move_shape(&mut base, Vector2::new(12.0, -8.0));

    let mut single = base.clone();
    rotate_shape(&mut single, 1.2, pivot);

    let mut stepped = base.clone();
    for _ in 0..240 {
        rotate_shape(&mut stepped, 1.2 / 240.0, pivot);
    }
    assert!(single.center().distance(stepped.center()) < 1e-9);
    assert!(angles_close(single.rotation, stepped.rotation, 1e-9));
    assert!(single.rotation < TAU);
}

#[test]
fn wall_erased_at_midpoint_becomes_two_walls() {
    let mut editor = Editor::default();
    let wall = editor
        .create_shape(ShapeKind::Wall, Point2::new(0.0, 0.0), Point2::new(100.0, 0.0))
        .unwrap();
    editor.set_tool(Tool::Erase);
    editor.pointer_down(Point2::new(50.0, 0.0));
    editor.pointer_up(Point2::new(50.0, 0.0));

    assert!(!editor.drawing().contains(wall));
    let spans: Vec<_> = editor
        .drawing()
        .shapes()
        .map(|(_, shape)| (shape.kind(), shape.span().unwrap()))
        .collect();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].0, ShapeKind::Wall);
    assert!(spans[0].1.1.distance(Point2::new(40.0, 0.0)) < 1e-9);
    assert!(spans[1].1.0.distance(Point2::new(60.0, 0.0)) < 1e-9);
    assert!(spans[1].1.1.distance(Point2::new(100.0, 0.0)) < 1e-9);
}

#[test]
fn circle_erase_produces_polyline() {
    let circle = Shape::circle(Point2::new(50.0, 50.0), 30.0, Style::default());
    let params = EraseParams {
        radius: 8.0,
        ..EraseParams::default()
    };
    let EraseOutcome::Replaced(lines) =
        erase_partial(Point2::new(80.0, 50.0), &circle, &params, &CapabilityTable::new())
    else {
        panic!("circle should be affected");
    };
    assert_eq!(lines.len(), 20);
    assert!(lines.iter().all(|line| line.kind() == ShapeKind::Line));
    // 相邻折线首尾相接。
    for pair in lines.windows(2) {
        let (_, end) = pair[0].span().unwrap();
        let (start, _) = pair[1].span().unwrap();
        assert!(end.distance(start) < 1e-9);
    }
}

#[test]
fn erase_miss_leaves_list_untouched() {
    let mut editor = Editor::default();
    editor.create_shape(ShapeKind::Kitchen, Point2::new(0.0, 0.0), Point2::new(60.0, 60.0));
    editor.create_shape(ShapeKind::Line, Point2::new(0.0, 100.0), Point2::new(60.0, 100.0));
    let before: Vec<_> = editor.drawing().shapes().cloned().collect();
    let history = editor.history().len();

    editor.set_tool(Tool::Erase);
    editor.pointer_down(Point2::new(400.0, 400.0));
    editor.pointer_move(Point2::new(420.0, 380.0));
    editor.pointer_up(Point2::new(420.0, 380.0));

    let after: Vec<_> = editor.drawing().shapes().cloned().collect();
    assert_eq!(before, after);
    assert_eq!(editor.history().len(), history);
}

#[test]
fn undo_after_delete_restores_fields() {
    let mut editor = Editor::default();
    for offset in 0..3 {
        let x = offset as f64 * 100.0;
        editor.create_shape(ShapeKind::Bathroom, Point2::new(x, 0.0), Point2::new(x + 60.0, 40.0));
    }
    let target = editor.shape_at(Point2::new(130.0, 20.0)).unwrap();
    editor.select(target).unwrap();
    editor.rotate_selected(0.4);
    let snapshot = editor.drawing().shape(target).unwrap().clone();

    assert_eq!(editor.delete_selected(), Some(target));
    assert_eq!(editor.drawing().len(), 2);
    assert!(editor.undo());
    assert_eq!(editor.drawing().len(), 3);
    assert_eq!(editor.drawing().shape(target), Some(&snapshot));
    assert!(editor.selected().is_none());
}

#[test]
fn history_cap_retains_latest_states() {
    let settings = EditorSettings {
        history_limit: 5,
        ..EditorSettings::default()
    };
    let mut editor = Editor::new(settings);
    for index in 0..9 {
        let x = index as f64 * 30.0;
        editor.create_shape(ShapeKind::Line, Point2::new(x, 0.0), Point2::new(x, 40.0));
    }
    assert_eq!(editor.history().len(), 5);
    for _ in 0..4 {
        assert!(editor.undo());
    }
    // 最早保留的状态含 5 条线，而不是初始空画布。
    assert_eq!(editor.drawing().len(), 5);
    assert!(!editor.undo());
}

#[test]
fn hit_test_center_after_transforms() {
    let mut editor = Editor::default();
    let id = editor
        .create_shape(ShapeKind::Elevator, Point2::new(0.0, 0.0), Point2::new(50.0, 30.0))
        .unwrap();
    editor.select(id).unwrap();
    editor.rotate_selected(1.0);
    let center = editor.drawing().shape(id).unwrap().center();
    editor.clear_selection();
    assert_eq!(editor.shape_at(center), Some(id));
}
