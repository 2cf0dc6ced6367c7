use super::Value;
use crate::Result;

use std::{
    collections::VecDeque,
    fmt,
    pin::Pin,
    task::{Context, Poll},
};
use tokio_stream::{Stream, StreamExt};

/// An asynchronous stream of query results.
///
/// Values already produced are buffered in front of the (optional) source
/// stream, which lets callers peek without consuming.
#[derive(Default)]
pub struct ValueStream {
    buffer: VecDeque<Value>,
    stream: Option<DynStream>,
}

struct Iter<I> {
    iter: I,
}

type DynStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send + 'static>>;

impl ValueStream {
    pub fn from_value(value: impl Into<Value>) -> Self {
        Self::from_vec(vec![value.into()])
    }

    pub fn from_vec(values: Vec<Value>) -> Self {
        Self {
            buffer: values.into(),
            stream: None,
        }
    }

    pub fn from_stream<T: Stream<Item = Result<Value>> + Send + 'static>(stream: T) -> Self {
        Self {
            buffer: VecDeque::new(),
            stream: Some(Box::pin(stream)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_iter<T, I>(iter: I) -> Self
    where
        T: Into<Value>,
        I: Iterator<Item = Result<T>> + Send + 'static,
    {
        Self::from_stream(Iter { iter })
    }

    /// Returns the next value in the stream
    pub async fn next(&mut self) -> Option<Result<Value>> {
        StreamExt::next(self).await
    }

    /// Peek at the next value without consuming it
    pub async fn peek(&mut self) -> Option<Result<&Value>> {
        if self.buffer.is_empty() {
            let stream = self.stream.as_mut()?;
            match stream.next().await? {
                Ok(value) => self.buffer.push_back(value),
                Err(err) => return Some(Err(err)),
            }
        }

        self.buffer.front().map(Ok)
    }

    /// The stream will yield at least this number of values
    pub fn min_len(&self) -> usize {
        let (ret, _) = self.size_hint();
        ret
    }

    /// Drains the stream, stopping at the first error.
    pub async fn collect(mut self) -> Result<Vec<Value>> {
        let mut ret = Vec::with_capacity(self.min_len());

        while let Some(res) = self.next().await {
            ret.push(res?);
        }

        Ok(ret)
    }
}

impl Stream for ValueStream {
    type Item = Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(next) = self.buffer.pop_front() {
            Poll::Ready(Some(Ok(next)))
        } else if let Some(stream) = self.stream.as_mut() {
            stream.as_mut().poll_next(cx)
        } else {
            Poll::Ready(None)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (low, high) = match &self.stream {
            Some(stream) => stream.size_hint(),
            None => (0, Some(0)),
        };

        let buffered = self.buffer.len();
        (low + buffered, high.map(|high| high + buffered))
    }
}

impl From<Value> for ValueStream {
    fn from(src: Value) -> Self {
        Self::from_value(src)
    }
}

impl From<Vec<Value>> for ValueStream {
    fn from(src: Vec<Value>) -> Self {
        Self::from_vec(src)
    }
}

impl<I> Unpin for Iter<I> {}

impl<T, I> Stream for Iter<I>
where
    I: Iterator<Item = Result<T>>,
    T: Into<Value>,
{
    type Item = Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.iter.next().map(|res| res.map(Into::into)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl fmt::Debug for ValueStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStream")
            .field("buffered", &self.buffer.len())
            .field("streaming", &self.stream.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn peek_does_not_consume() {
        let mut stream = ValueStream::from_iter(vec![Ok::<_, Error>(1), Ok(2)].into_iter());

        assert_eq!(*stream.peek().await.unwrap().unwrap(), Value::I32(1));
        assert_eq!(stream.min_len(), 2);
        assert_eq!(
            stream.collect().await.unwrap(),
            vec![Value::I32(1), Value::I32(2)]
        );
    }

    #[tokio::test]
    async fn collect_stops_at_first_error() {
        let stream = ValueStream::from_iter(
            vec![Ok(Value::I32(1)), Err(Error::no_elements()), Ok(Value::I32(3))].into_iter(),
        );

        let err = stream.collect().await.unwrap_err();
        assert!(err.is_no_elements());
    }

    #[tokio::test]
    async fn empty_stream() {
        let mut stream = ValueStream::default();
        assert!(stream.peek().await.is_none());
        assert!(stream.next().await.is_none());
    }
}
