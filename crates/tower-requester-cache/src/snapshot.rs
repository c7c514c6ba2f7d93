//! Serialized form of a cached response.

use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode, Version};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tower_requester_core::{Body, BoxError, HttpResponse};

/// Status, version, headers and body of a response, as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    status: u16,
    version: u8,
    headers: Vec<(String, Vec<u8>)>,
    body: Vec<u8>,
}

impl CachedResponse {
    /// Reads the whole response body and captures the response.
    pub async fn capture(response: HttpResponse) -> Result<Self, BoxError> {
        let (parts, body) = response.into_parts();
        let body = body.collect().await?.to_bytes();
        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();

        Ok(Self {
            status: parts.status.as_u16(),
            version: encode_version(parts.version),
            headers,
            body: body.to_vec(),
        })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn encode(&self) -> Result<Bytes, BoxError> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        Ok(Bytes::from(bytes))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BoxError> {
        let (snapshot, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(snapshot)
    }

    /// Builds a fresh response with its own readable body.
    pub fn to_response(&self) -> Result<HttpResponse, BoxError> {
        let mut response = HttpResponse::new(Body::from(Bytes::copy_from_slice(&self.body)));
        *response.status_mut() = StatusCode::from_u16(self.status)?;
        *response.version_mut() = decode_version(self.version);
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            headers.append(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_bytes(value)?,
            );
        }
        Ok(response)
    }
}

fn encode_version(version: Version) -> u8 {
    match version {
        Version::HTTP_09 => 9,
        Version::HTTP_10 => 10,
        Version::HTTP_2 => 20,
        Version::HTTP_3 => 30,
        _ => 11,
    }
}

fn decode_version(version: u8) -> Version {
    match version {
        9 => Version::HTTP_09,
        10 => Version::HTTP_10,
        20 => Version::HTTP_2,
        30 => Version::HTTP_3,
        _ => Version::HTTP_11,
    }
}
