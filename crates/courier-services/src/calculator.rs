//! Calculator service
//!
//! `GET /add?t1=2&t2=3` answers `5`. The same handler is mounted twice:
//! `/add` behind the exception middleware, so bad operands give 418, and
//! `/unsafeadd` without it, so they surface as a 500.

use std::sync::Arc;

use courier_api::{
    handler_fn, ApiError, ApiResult, ExceptionMiddleware, HandlerMeta, HttpMethod, Request,
    Response, Router,
};

/// Sum of the `t1` and `t2` query parameters
///
/// A missing operand is a plain 400. An operand that is not an `i32`, or a
/// sum that overflows, is a handler error.
pub async fn add(req: Request) -> ApiResult<Response> {
    let (Some(t1), Some(t2)) = (req.parameter("t1"), req.parameter("t2")) else {
        return Ok(Response::for_status(400));
    };

    let sum = parse_operand("t1", t1)?
        .checked_add(parse_operand("t2", t2)?)
        .ok_or_else(|| ApiError::Handler(format!("{} + {} overflows", t1, t2)))?;

    Response::for_payload(&sum)
}

fn parse_operand(name: &str, value: &str) -> ApiResult<i32> {
    value
        .parse()
        .map_err(|e| ApiError::Handler(format!("{} is not an integer ({:?}): {}", name, value, e)))
}

/// Register `GET /add` and `GET /unsafeadd`
pub fn register(router: &mut Router) -> ApiResult<()> {
    router.route_with(
        HttpMethod::Get,
        "/add",
        Arc::new(ExceptionMiddleware::new()),
        handler_fn(add),
        HandlerMeta::new("add").summary("Add t1 and t2"),
    )?;
    router.get(
        "/unsafeadd",
        handler_fn(add),
        HandlerMeta::new("unsafe_add").summary("Add t1 and t2 without error mapping"),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(q: &str) -> Request {
        Request::new(HttpMethod::Get, "/add").with_query(q)
    }

    #[tokio::test]
    async fn test_add() {
        let resp = add(query("t1=2&t2=3")).await.unwrap();
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.body_text(), "5");
    }

    #[tokio::test]
    async fn test_add_negative() {
        let resp = add(query("t1=-7&t2=%2B3")).await.unwrap();
        assert_eq!(resp.body_text(), "-4");
    }

    #[tokio::test]
    async fn test_missing_operand_is_bad_request() {
        let resp = add(query("t1=2")).await.unwrap();
        assert_eq!(resp.status_code(), 400);
        assert!(resp.body_bytes().is_empty());

        let resp = add(query("")).await.unwrap();
        assert_eq!(resp.status_code(), 400);
    }

    #[tokio::test]
    async fn test_bad_operand_is_handler_error() {
        let err = add(query("t1=two&t2=3")).await.unwrap_err();
        assert!(matches!(err, ApiError::Handler(_)));

        let err = add(query("t1=1.5&t2=3")).await.unwrap_err();
        assert!(matches!(err, ApiError::Handler(_)));
    }

    #[tokio::test]
    async fn test_overflow_is_handler_error() {
        let err = add(query("t1=2147483647&t2=1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Handler(_)));
    }

    #[tokio::test]
    async fn test_registered_routes_map_errors_differently() {
        let mut router = Router::new();
        register(&mut router).unwrap();

        let safe = Request::new(HttpMethod::Get, "/add").with_query("t1=x&t2=1");
        assert_eq!(router.dispatch(safe).await.status_code(), 418);

        let unsafe_req = Request::new(HttpMethod::Get, "/unsafeadd").with_query("t1=x&t2=1");
        assert_eq!(router.dispatch(unsafe_req).await.status_code(), 500);
    }
}
