//! VIM 错误定义

use thiserror::Error;

/// VIM 错误类型
#[derive(Error, Debug)]
pub enum VimError {
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

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("超时错误: {0}")]
    Timeout(String),

    #[error("操作已取消: {0}")]
    Cancelled(String),
}

impl From<reqwest::Error> for VimError {
    fn from(e: reqwest::Error) -> Self {
        VimError::HttpError(e.to_string())
    }
}

impl From<serde_json::Error> for VimError {
    fn from(e: serde_json::Error) -> Self {
        VimError::ParseError(e.to_string())
    }
}

/// VIM 结果类型
pub type Result<T> = std::result::Result<T, VimError>;
