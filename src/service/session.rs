//! Caller session taken from request headers
//!
//! Authentication happens upstream; by the time a request reaches this
//! server the session layer has put the caller's role and account id into
//! headers. Missing or empty headers mean an anonymous caller.

use actix_web::HttpRequest;
use log::debug;

pub const ACC_TYPE_HEADER: &str = "X-Acc-Type";
pub const ACC_ID_HEADER: &str = "X-Acc-Id";

/// Role and account of the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    /// Role looked up in the permission matrix
    pub acc_type: Option<String>,
    /// Acting account, recorded as uploader
    pub acc_id: Option<String>,
}

impl SessionContext {
    pub fn new(acc_type: Option<&str>, acc_id: Option<&str>) -> Self {
        Self {
            acc_type: acc_type.map(str::to_string),
            acc_id: acc_id.map(str::to_string),
        }
    }

    /// Read the session headers and tag this thread's log context with them
    pub fn from_request(req: &HttpRequest) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let context = Self {
            acc_type: header(ACC_TYPE_HEADER),
            acc_id: header(ACC_ID_HEADER),
        };

        log_mdc::insert("acc_type", context.acc_type.as_deref().unwrap_or("-"));
        log_mdc::insert("acc_id", context.acc_id.as_deref().unwrap_or("-"));
        debug!("Session: type={:?} id={:?}", context.acc_type, context.acc_id);

        context
    }

    pub fn role(&self) -> Option<&str> {
        self.acc_type.as_deref()
    }
}
