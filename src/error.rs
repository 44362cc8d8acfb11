use slitchart::ChartError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("Error writing '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}
