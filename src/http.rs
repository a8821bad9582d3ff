use crate::error::{GraderError, Result};
use reqwest::blocking::{Client, Response};
use std::time::Duration;

const MAX_ERROR_BODY: usize = 512;

pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("canvas-grader/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(GraderError::from)
}

/// Turns a non-2xx response into [`GraderError::Api`].
pub fn check_status(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let mut body = response.text().unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(GraderError::Api {
        service,
        status: status.as_u16(),
        url,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::serve_responses;
    use crate::retry::with_retry;
    use crate::types::config::RetryPolicy;
    use std::net::TcpListener;

    fn no_wait(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_base_ms: 0,
        }
    }

    #[test]
    fn undecodable_body_fails_without_retry() {
        let (base_url, server) = serve_responses(vec![(200, "this is not json".to_string())]);
        let client = build_client(5).expect("client");

        let result: Result<Vec<String>> = with_retry(&no_wait(3), "decode", || {
            let response = client.get(&base_url).send()?;
            Ok(check_status("github", response)?.json()?)
        });

        let err = result.expect_err("body is not json");
        assert!(matches!(&err, GraderError::Http(inner) if inner.is_decode()), "{err}");
        assert!(!err.is_transient());
        assert_eq!(server.join().expect("server").len(), 1);
    }

    #[test]
    fn refused_connection_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let client = build_client(5).expect("client");
        let err = GraderError::from(
            client
                .get(format!("http://{addr}/"))
                .send()
                .expect_err("nothing is listening"),
        );
        assert!(err.is_transient(), "{err}");
    }

    #[test]
    fn invalid_url_is_not_transient() {
        let client = build_client(5).expect("client");
        let err = GraderError::from(client.get("not a url").send().expect_err("bad url"));
        assert!(!err.is_transient());
    }

    #[test]
    fn error_status_becomes_api_error_with_truncated_body() {
        let (base_url, server) = serve_responses(vec![(503, "x".repeat(2000))]);
        let client = build_client(5).expect("client");
        let response = client.get(&base_url).send().expect("response");
        let err = check_status("canvas", response).expect_err("503 is an error");
        match &err {
            GraderError::Api {
                service,
                status,
                body,
                ..
            } => {
                assert_eq!(*service, "canvas");
                assert_eq!(*status, 503);
                assert_eq!(body.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_transient());
        server.join().expect("server");
    }
}
