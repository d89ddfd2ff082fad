//! Fallback response bodies for unmatched routes and upstream/balance
//! failures. The Go original serves these from standalone TCP listeners
//! (`default_page/p404.go`); here they're produced inline by the dispatcher
//! since pingora already owns the listening socket.

use pingora::http::ResponseHeader;

pub fn not_found() -> ResponseHeader {
    error_response(404)
}

/// Balance/target-resolution failure on a matched rule: spec.md §4.3/§6
/// both require a `500` here, not a `502` — there is no well-formed
/// upstream to have rejected the connection, routing itself failed.
pub fn internal_error() -> ResponseHeader {
    error_response(500)
}

fn error_response(status: u16) -> ResponseHeader {
    let mut header = ResponseHeader::build(status, None).expect("status code is a valid response code");
    header
        .insert_header("Content-Type", "text/plain;charset=UTF-8")
        .ok();
    header.insert_header("Content-Length", "0").ok();
    header.insert_header("Proxy-Error-Status", status.to_string()).ok();
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_expected_status() {
        let header = not_found();
        assert_eq!(header.status.as_u16(), 404);
    }

    #[test]
    fn internal_error_carries_expected_status() {
        let header = internal_error();
        assert_eq!(header.status.as_u16(), 500);
    }
}
