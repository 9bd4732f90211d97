use archi_engine::errors::EngineError;
use archi_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("快照读写失败: {0}")]
    Io(#[from] IoError),
    #[error("编辑器操作失败: {0}")]
    Engine(#[from] EngineError),
}
