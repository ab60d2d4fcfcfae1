use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GateError {
    #[error("store error: {0}")]
    Store(String),

    #[error("bulk load failed ({failed} of {total} writes): {source}")]
    Load {
        total: usize,
        failed: usize,
        #[source]
        source: Box<GateError>,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("task error: {0}")]
    Task(String),
}

pub type GateResult<T> = Result<T, GateError>;
