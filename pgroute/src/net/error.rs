use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("bind has {codes} format codes for {params} parameters")]
    FormatCodes { codes: usize, params: usize },

    #[error("unknown format code: {0}")]
    FormatCode(i16),

    #[error("parameter ${0} is too large")]
    ParameterTooLarge(usize),
}
