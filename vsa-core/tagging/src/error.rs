//! 标签客户端错误定义

use thiserror::Error;

/// 标签客户端错误类型
#[derive(Error, Debug)]
pub enum TaggingError {
    #[error(transparent)]
    Transport(#[from] vsa_transport::TransportError),

    #[error("HTTP 错误: {0}")]
    HttpError(String),

    #[error("认证错误: {0}")]
    AuthError(String),

    #[error("API 错误 [{0}]: {1}")]
    ApiError(u16, String),

    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("结果不唯一: {0}")]
    Ambiguous(String),

    #[error("参数校验失败: {0}")]
    Validation(String),
}

impl From<reqwest::Error> for TaggingError {
    fn from(e: reqwest::Error) -> Self {
        TaggingError::HttpError(e.to_string())
    }
}

impl From<serde_json::Error> for TaggingError {
    fn from(e: serde_json::Error) -> Self {
        TaggingError::ParseError(e.to_string())
    }
}

/// 标签客户端结果类型
pub type Result<T> = std::result::Result<T, TaggingError>;
