//! Request and response body.
//!
//! [`Body`] is the single body type carried through every layer of a chain.
//! It distinguishes an *absent* body from a present-but-empty one, which the
//! retry and cache layers rely on, and it can be partially read and stitched
//! back together so a layer can inspect a body without consuming it.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, StreamBody};

use crate::error::BoxError;

/// Body of an [`HttpRequest`](crate::HttpRequest) or [`HttpResponse`](crate::HttpResponse).
pub struct Body {
    kind: Kind,
}

enum Kind {
    /// No body at all.
    Empty,
    /// A single buffered chunk, taken on first poll.
    Full(Option<Bytes>),
    /// An already-read prefix followed by the unread rest.
    Prefixed { prefix: Option<Bytes>, rest: Box<Body> },
    Boxed(BoxBody<Bytes, BoxError>),
}

impl Body {
    /// Creates an absent body.
    pub fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    /// Wraps any `http_body::Body` yielding [`Bytes`].
    pub fn new<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            kind: Kind::Boxed(body.map_err(Into::<BoxError>::into).boxed()),
        }
    }

    /// Creates a body from a stream of byte chunks.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        use futures::TryStreamExt;

        Self::new(StreamBody::new(
            stream.map_ok(Frame::data).map_err(Into::<BoxError>::into),
        ))
    }

    /// Returns `true` if this body was created with [`Body::empty`].
    ///
    /// A zero-length buffered body is *not* absent.
    pub fn is_absent(&self) -> bool {
        matches!(self.kind, Kind::Empty)
    }

    /// Returns `true` if the body may still yield data.
    pub fn is_present(&self) -> bool {
        !self.is_end_stream()
    }

    /// Reads at most `limit` bytes from the front of the body.
    ///
    /// Returns the bytes read and a body yielding everything that was not
    /// read. Fewer than `limit` bytes are returned only when the body ended.
    /// Trailers are dropped.
    pub async fn collect_limited(mut self, limit: usize) -> Result<(Bytes, Body), BoxError> {
        let mut buf = BytesMut::new();
        while buf.len() < limit {
            match self.frame().await {
                Some(Ok(frame)) => {
                    let Ok(mut data) = frame.into_data() else {
                        continue;
                    };
                    let take = (limit - buf.len()).min(data.len());
                    buf.extend_from_slice(&data.split_to(take));
                    if !data.is_empty() {
                        return Ok((buf.freeze(), Body::prepend(data, self)));
                    }
                }
                Some(Err(err)) => return Err(err),
                None => return Ok((buf.freeze(), Body::empty())),
            }
        }
        Ok((buf.freeze(), self))
    }

    /// Rebuilds a body from an already-read `prefix` and the unread `rest`.
    pub fn prepend(prefix: Bytes, rest: Body) -> Self {
        if prefix.is_empty() {
            return rest;
        }
        if rest.is_end_stream() {
            return Body::from(prefix);
        }
        Self {
            kind: Kind::Prefixed {
                prefix: Some(prefix),
                rest: Box::new(rest),
            },
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            Kind::Empty => "Empty",
            Kind::Full(_) => "Full",
            Kind::Prefixed { .. } => "Prefixed",
            Kind::Boxed(_) => "Boxed",
        };
        f.debug_struct("Body").field("kind", &kind).finish()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        let data = if bytes.is_empty() { None } else { Some(bytes) };
        Self {
            kind: Kind::Full(data),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(vec: Vec<u8>) -> Self {
        Bytes::from(vec).into()
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Bytes::from(s).into()
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Bytes::from_static(s.as_bytes()).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(s: &'static [u8]) -> Self {
        Bytes::from_static(s).into()
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().kind {
            Kind::Empty => Poll::Ready(None),
            Kind::Full(data) => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            Kind::Prefixed { prefix, rest } => match prefix.take() {
                Some(prefix) => Poll::Ready(Some(Ok(Frame::data(prefix)))),
                None => Pin::new(rest.as_mut()).poll_frame(cx),
            },
            Kind::Boxed(body) => Pin::new(body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Empty => true,
            Kind::Full(data) => data.is_none(),
            Kind::Prefixed { prefix, rest } => prefix.is_none() && rest.is_end_stream(),
            Kind::Boxed(body) => body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            Kind::Empty => SizeHint::with_exact(0),
            Kind::Full(data) => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            Kind::Prefixed { prefix, rest } => {
                let head = prefix.as_ref().map_or(0, |p| p.len() as u64);
                let tail = rest.size_hint();
                let mut hint = SizeHint::new();
                hint.set_lower(tail.lower() + head);
                if let Some(upper) = tail.upper() {
                    hint.set_upper(upper + head);
                }
                hint
            }
            Kind::Boxed(body) => body.size_hint(),
        }
    }
}
