use brewviz_core::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invalid viewer config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("no drink `{0}` on the menu")]
    UnknownDrink(String),
}
