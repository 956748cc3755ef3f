use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::header,
    HttpRequest, HttpResponse, HttpResponseBuilder,
};
use serde::Serialize;

use crate::error::AppError;

/// One-time notice attached to the response that triggered it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flash {
    Success(String),
    Notice(String),
}

#[derive(Serialize)]
pub struct ResponseDto<T: Serialize> {
    pub data: Option<T>,
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

impl<T: Serialize> ResponseDto<T> {
    pub fn success(data: Option<T>) -> Self {
        Self {
            data,
            code: 0,
            msg: "".to_string(),
            flash: None,
        }
    }

    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }
}

#[derive(Serialize)]
struct InvalidDto<'a> {
    render: &'a str,
    errors: &'a [String],
}

/// `303 See Other` pointing at `location`.
pub fn see_other(location: &str) -> HttpResponseBuilder {
    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, location.to_string()));
    builder
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = match err {
        JsonPayloadError::ContentType => AppError::param_error("request body must be JSON"),
        JsonPayloadError::Deserialize(e) => AppError::param_error(format!("malformed request: {}", e)),
        _ => AppError::param_error("malformed request"),
    };
    app_err.into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::param_error(format!("malformed query: {}", err)).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::param_error(format!("malformed path: {}", err)).into()
}

pub fn response_from_error(err: &AppError) -> HttpResponse {
    match err {
        AppError::Biz { code, msg } => HttpResponse::Ok().json(ResponseDto::<()> {
            data: None,
            code: *code,
            msg: msg.clone(),
            flash: None,
        }),
        AppError::Invalid { render, errors } => HttpResponse::Ok().json(ResponseDto {
            data: Some(InvalidDto { render, errors }),
            code: err.code(),
            msg: err.msg(),
            flash: None,
        }),
        AppError::Redirect { location, flash } => see_other(location).json(ResponseDto::<()> {
            data: None,
            code: 0,
            msg: "".to_string(),
            flash: flash.clone(),
        }),
    }
}
