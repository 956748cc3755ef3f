use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::header::{self, HeaderName, HeaderValue},
    http::Method,
    middleware::Next,
    web, Error, HttpResponse,
};

use crate::config::AppConfig;

/// Answers preflight requests and lets the configured front end send the
/// session cookie along with cross-origin calls.
pub async fn cors_handler<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody,
{
    let (origin, token_header) = match req.app_data::<web::Data<AppConfig>>() {
        Some(config) => (allowed_origin(&req, config), config.token_header.clone()),
        None => (AllowedOrigin::Any, "token".to_string()),
    };

    let mut res = if req.method() == Method::OPTIONS {
        let res = HttpResponse::NoContent().finish().map_into_right_body();
        req.into_response(res)
    } else {
        next.call(req).await?.map_into_left_body()
    };

    let headers = res.headers_mut();
    match origin {
        AllowedOrigin::Any => {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );
        }
        AllowedOrigin::Front { origin, credentials } => {
            if let Ok(origin) = HeaderValue::from_str(&origin) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            }
            if credentials {
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
            }
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    if let Ok(allowed) = HeaderValue::from_str(&format!(
        "Origin, X-Requested-With, Content-Type, Accept, {}",
        token_header
    )) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allowed);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(
        HeaderName::from_static("pragma"),
        HeaderValue::from_static("no-cache"),
    );

    Ok(res)
}

enum AllowedOrigin {
    /// No front end configured: any origin, never with credentials.
    Any,
    /// Credentials are only allowed when the caller is the configured front end.
    Front { origin: String, credentials: bool },
}

fn allowed_origin(req: &ServiceRequest, config: &AppConfig) -> AllowedOrigin {
    let front = config.front_domain.trim().trim_end_matches('/');
    if front.is_empty() {
        return AllowedOrigin::Any;
    }
    let credentials = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_end_matches('/').eq_ignore_ascii_case(front))
        .unwrap_or(false);
    AllowedOrigin::Front {
        origin: front.to_string(),
        credentials,
    }
}
