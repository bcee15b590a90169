//! Logging policy for outgoing requests and their responses.
//!
//! Two independent lists: credential exchanges never log their bodies, and
//! high-frequency polling endpoints log at `debug` instead of `info`.

use serde_json::Value;
use uuid::Uuid;

use super::paths;
use super::transport::{HttpResponse, Method};

const REDACTED_BODY: &str = "***";

const REDACTED: &[(Method, &str)] = &[(Method::Put, paths::SESSIONS)];

const QUIET: &[(Method, &str)] = &[
    (Method::Get, paths::TASKS),
    (Method::Get, paths::SYSTEM_INFO),
    (Method::Get, paths::STORAGES),
    (Method::Post, paths::POOLS_QUERY),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum LogMode {
    Normal,
    Quiet,
    Redacted,
}

impl LogMode {
    pub(crate) fn for_request(method: Method, path: &str) -> Self {
        let matches =
            |list: &[(Method, &str)]| list.iter().any(|(m, p)| *m == method && path.starts_with(p));
        if matches(REDACTED) {
            Self::Redacted
        } else if matches(QUIET) {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    fn render_body(self, body: Option<String>) -> String {
        match self {
            Self::Redacted => String::from(REDACTED_BODY),
            Self::Normal | Self::Quiet => body.unwrap_or_default(),
        }
    }

    pub(crate) fn log_request(self, request_id: Uuid, method: Method, url: &str, body: Option<&Value>) {
        let body = self.render_body(body.map(Value::to_string));
        match self {
            Self::Quiet => {
                tracing::debug!(request_id = %request_id, method = %method, url, body = %body, "sending request");
            }
            Self::Normal | Self::Redacted => {
                tracing::info!(request_id = %request_id, method = %method, url, body = %body, "sending request");
            }
        }
    }

    pub(crate) fn log_response(self, request_id: Uuid, url: &str, response: &HttpResponse) {
        let body = self.render_body(Some(response.text()));
        match self {
            Self::Quiet => {
                tracing::debug!(request_id = %request_id, url, status = response.status, body = %body, "received response");
            }
            Self::Normal | Self::Redacted => {
                tracing::info!(request_id = %request_id, url, status = response.status, body = %body, "received response");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Method::Put, paths::SESSIONS, LogMode::Redacted)]
    #[case(Method::Delete, paths::SESSIONS, LogMode::Normal)]
    #[case(Method::Get, "/rest/taskmgmt/v1/tasks/abc", LogMode::Quiet)]
    #[case(Method::Get, paths::SYSTEM_INFO, LogMode::Quiet)]
    #[case(Method::Post, paths::POOLS_QUERY, LogMode::Quiet)]
    #[case(Method::Post, paths::FILESYSTEMS_CREATE, LogMode::Normal)]
    fn modes_follow_method_and_path(
        #[case] method: Method,
        #[case] path: &str,
        #[case] expected: LogMode,
    ) {
        assert_eq!(LogMode::for_request(method, path), expected);
    }

    #[test]
    fn redacted_mode_hides_bodies() {
        let rendered = LogMode::Redacted.render_body(Some(String::from(r#"{"value":"pw"}"#)));
        assert_eq!(rendered, REDACTED_BODY);
        let plain = LogMode::Quiet.render_body(Some(String::from("{}")));
        assert_eq!(plain, "{}");
    }
}
