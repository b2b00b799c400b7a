//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{message}, line {line}")]
    Syntax { message: String, line: usize },

    #[error("shard {0} has no databases")]
    MissingShard(usize),

    #[error("shard {0} has more than one primary")]
    MultiplePrimaries(usize),

    #[error("plugin \"{0}\" is configured more than once")]
    DuplicatePlugin(String),
}

impl Error {
    /// Attach the line number of the offending TOML to the parser error.
    pub fn config(source: &str, err: toml::de::Error) -> Self {
        let message = err.message().to_owned();
        let line = match err.span() {
            Some(span) => {
                let end = span.start.min(source.len());
                source.as_bytes()[..end]
                    .iter()
                    .filter(|&&c| c == b'\n')
                    .count()
                    + 1
            }
            None => 0,
        };

        Self::Syntax { message, line }
    }
}
