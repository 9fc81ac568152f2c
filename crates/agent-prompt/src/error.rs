use thiserror::Error;

pub type Result<T> = std::result::Result<T, PromptError>;

#[derive(Error, Debug)]
pub enum PromptError {
    /// The source is not valid Jinja
    #[error("Template '{name}' does not parse: {detail}")]
    Syntax { name: String, detail: String },

    /// Rendering failed, e.g. a filter rejected its input
    #[error("Template '{name}' failed to render: {detail}")]
    Render { name: String, detail: String },

    #[error("No template named '{0}'")]
    Unknown(String),

    /// An override file or directory could not be read
    #[error("Cannot read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
