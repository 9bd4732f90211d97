pub mod cli;
pub mod errors;
pub mod loader;
pub mod render;

use archi_config::AppConfig;
use errors::FrontendError;
use tracing::info;

pub use cli::CliOptions;

/// 启动 CLI 演示或返回错误。
pub fn run_cli_demo(config: &AppConfig, options: &CliOptions) -> Result<(), FrontendError> {
    info!(open = ?options.open, save = ?options.save, "启动 CLI 演示前端");
    cli::run_demo(config, options)
}
