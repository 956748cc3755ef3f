use actix_web::{http::StatusCode, ResponseError};
use thiserror::Error;

use crate::response::{response_from_error, Flash};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{msg}")]
    Biz { code: i32, msg: String },
    /// Validation failure; `render` names the form the client should show again.
    #[error("{}", .errors.join(", "))]
    Invalid {
        render: &'static str,
        errors: Vec<String>,
    },
    #[error("redirect to {location}")]
    Redirect {
        location: String,
        flash: Option<Flash>,
    },
}

impl AppError {
    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::Biz { code: 1, msg: msg.into() }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self::Biz { code: 2, msg: msg.into() }
    }

    pub fn system_exception() -> Self {
        Self::Biz { code: 99, msg: "system_exception".to_string() }
    }

    pub fn invalid(render: &'static str, errors: Vec<String>) -> Self {
        Self::Invalid { render, errors }
    }

    /// Anonymous access to a page that needs a session.
    pub fn need_login() -> Self {
        Self::Redirect {
            location: "/signin".to_string(),
            flash: Some(Flash::Notice("Please sign in to access this page.".to_string())),
        }
    }

    /// Signed in, but not allowed to touch this resource.
    pub fn access_denied() -> Self {
        Self::Redirect {
            location: "/".to_string(),
            flash: None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Biz { code, .. } => *code,
            Self::Invalid { .. } => 1,
            Self::Redirect { .. } => 0,
        }
    }

    pub fn msg(&self) -> String {
        match self {
            Self::Biz { msg, .. } => msg.clone(),
            Self::Invalid { errors, .. } => errors.first().cloned().unwrap_or_default(),
            Self::Redirect { .. } => String::new(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Redirect { .. } => StatusCode::SEE_OTHER,
            _ => StatusCode::OK,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        response_from_error(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn need_login_redirects_to_signin_with_notice() {
        let err = AppError::need_login();
        assert_eq!(err.status_code(), StatusCode::SEE_OTHER);
        match err {
            AppError::Redirect { location, flash } => {
                assert_eq!(location, "/signin");
                assert!(matches!(flash, Some(Flash::Notice(ref m)) if m.contains("sign in")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn invalid_reports_first_message_with_param_code() {
        let err = AppError::invalid("new", vec!["Name can't be blank".into(), "Email is invalid".into()]);
        assert_eq!(err.code(), 1);
        assert_eq!(err.msg(), "Name can't be blank");
        assert_eq!(err.to_string(), "Name can't be blank, Email is invalid");
        assert_eq!(err.status_code(), StatusCode::OK);
    }
}
