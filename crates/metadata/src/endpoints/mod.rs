//! One thin function per remote operation.
//!
//! Every function here builds a request, sends it through the caller's
//! [`Transport`](crate::transport::Transport) and classifies the answer:
//! 401 is [`MetadataError::Unauthorized`], 404 or a backend "no results"
//! answer is [`MetadataError::NotFound`], anything else unexpected is
//! [`MetadataError::Network`]. Providers never look at status codes.

pub mod imdb;
pub mod omdb;
pub mod tmdb;
pub mod tvdb;
pub mod tvdbv4;

use serde_json::Value;

use crate::MetadataError;
use crate::transport::HttpResponse;

/// Maps a raw response to its body or a classified error.
pub(crate) fn expect_body(backend: &str, resp: HttpResponse) -> Result<Value, MetadataError> {
    match resp.status {
        401 => Err(MetadataError::Unauthorized(format!(
            "{backend} rejected the credentials"
        ))),
        404 => Err(MetadataError::NotFound),
        200..=299 => resp
            .body
            .ok_or_else(|| MetadataError::Network(format!("{backend} returned an unreadable body"))),
        status => Err(MetadataError::Network(format!("{backend} returned {status}"))),
    }
}

/// True when the JSON value is absent, null, or an empty array/object/string.
pub(crate) fn is_empty(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
