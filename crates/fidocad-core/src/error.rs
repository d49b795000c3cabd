//! 核心错误定义

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FidoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad arguments on {command}")]
    BadArguments { command: String },

    #[error("Invalid number: '{token}'")]
    InvalidNumber { token: String },

    #[error("Invalid primitive: {0}")]
    InvalidPrimitive(String),

    #[error("Unrecognized macro '{0}'")]
    UnrecognizedMacro(String),

    #[error("Library error: {0}")]
    Library(String),

    #[error("Macro nesting deeper than {0} levels")]
    MacroTooDeep(usize),

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<FidoError>,
    },
}

impl FidoError {
    pub fn bad_arguments(command: &str) -> Self {
        FidoError::BadArguments {
            command: command.to_string(),
        }
    }

    /// 附加行号
    pub fn at_line(self, line: usize) -> Self {
        FidoError::AtLine {
            line,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, FidoError>;

/// 解析整数记号，失败时返回 [`FidoError::InvalidNumber`]
pub fn int_token(token: &str) -> Result<i32> {
    crate::math::parse_int(token).ok_or_else(|| FidoError::InvalidNumber {
        token: token.to_string(),
    })
}

/// 解析浮点记号
pub fn f64_token(token: &str) -> Result<f64> {
    crate::math::parse_f64(token).ok_or_else(|| FidoError::InvalidNumber {
        token: token.to_string(),
    })
}
