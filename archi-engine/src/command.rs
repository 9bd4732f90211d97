use std::collections::HashMap;

use crate::editor::Editor;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub editor: &'a mut Editor,
}

/// 快捷键等外部调用方通过命令名驱动编辑器。
pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        for command in EDITOR_COMMANDS {
            bus.register(command);
        }
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 不带参数、直接作用于编辑器的命令。
#[derive(Clone, Copy)]
struct EditorCommand {
    name: &'static str,
    run: fn(&mut Editor) -> CommandResponse,
}

impl CommandHandler for EditorCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        (self.run)(context.editor)
    }
}

fn respond(done: bool, ok: &str, err: &str) -> CommandResponse {
    if done {
        CommandResponse::ok(ok)
    } else {
        CommandResponse::err(err)
    }
}

const EDITOR_COMMANDS: [EditorCommand; 14] = [
    EditorCommand {
        name: "undo",
        run: |editor| respond(editor.undo(), "已撤销", "没有可撤销的操作"),
    },
    EditorCommand {
        name: "redo",
        run: |editor| respond(editor.redo(), "已重做", "没有可重做的操作"),
    },
    EditorCommand {
        name: "delete",
        run: |editor| respond(editor.delete_selected().is_some(), "已删除选中图元", "未选中图元"),
    },
    EditorCommand {
        name: "duplicate",
        run: |editor| respond(editor.duplicate_selected().is_some(), "已复制并选中副本", "未选中图元"),
    },
    EditorCommand {
        name: "copy",
        run: |editor| respond(editor.copy_selected(), "已复制到剪贴板", "未选中图元"),
    },
    EditorCommand {
        name: "paste",
        run: |editor| respond(editor.paste().is_some(), "已粘贴", "剪贴板为空"),
    },
    EditorCommand {
        name: "rotate_90",
        run: |editor| respond(editor.rotate_selected_quarter(), "已旋转 90°", "未选中图元"),
    },
    EditorCommand {
        name: "clear_selection",
        run: |editor| {
            editor.clear_selection();
            CommandResponse::ok("选中已清空")
        },
    },
    EditorCommand {
        name: "bring_to_front",
        run: |editor| respond(editor.bring_to_front(), "已置于顶层", "未选中图元"),
    },
    EditorCommand {
        name: "send_to_back",
        run: |editor| respond(editor.send_to_back(), "已置于底层", "未选中图元"),
    },
    EditorCommand {
        name: "clear",
        run: |editor| {
            editor.clear();
            CommandResponse::ok("画布已清空")
        },
    },
    EditorCommand {
        name: "zoom_in",
        run: |editor| {
            editor.zoom_in();
            CommandResponse::ok(format!("缩放 {:.2}", editor.zoom()))
        },
    },
    EditorCommand {
        name: "zoom_out",
        run: |editor| {
            editor.zoom_out();
            CommandResponse::ok(format!("缩放 {:.2}", editor.zoom()))
        },
    },
    EditorCommand {
        name: "zoom_reset",
        run: |editor| {
            editor.zoom_reset();
            CommandResponse::ok("缩放已重置")
        },
    },
];

#[cfg(test)]
mod tests {
    use archi_core::geometry::Point2;
    use archi_core::kind::ShapeKind;

    use super::*;

    #[test]
    fn every_command_is_registered() {
        let bus = CommandBus::new();
        let mut names: Vec<&str> = bus.available_commands().copied().collect();
        names.sort_unstable();
        assert_eq!(names.len(), 14);
        assert!(names.contains(&"rotate_90"));
        assert!(names.contains(&"zoom_reset"));
    }

    #[test]
    fn delete_then_undo_through_bus() {
        let mut editor = Editor::default();
        let id = editor
            .create_shape(ShapeKind::Door, Point2::new(0.0, 0.0), Point2::new(80.0, 15.0))
            .unwrap();
        editor.select(id).unwrap();

        let bus = CommandBus::new();
        let mut context = CommandContext { editor: &mut editor };
        assert!(bus.dispatch(&CommandRequest::named("delete"), &mut context).success);
        assert!(context.editor.drawing().is_empty());
        assert!(!bus.dispatch(&CommandRequest::named("delete"), &mut context).success);

        assert!(bus.dispatch(&CommandRequest::named("undo"), &mut context).success);
        assert!(context.editor.drawing().contains(id));
    }

    #[test]
    fn unknown_command_is_reported() {
        let mut editor = Editor::default();
        let bus = CommandBus::new();
        let mut context = CommandContext { editor: &mut editor };
        let response = bus.dispatch(&CommandRequest::named("explode"), &mut context);
        assert!(!response.success);
        assert!(response.message.unwrap().contains("explode"));
    }
}
