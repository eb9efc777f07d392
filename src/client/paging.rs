//! Server-driven paging over `@odata.nextLink`.
//!
//! A [`PageIterator`] starts from a page the caller already fetched and
//! follows next links with plain `GET`s until the service stops returning
//! one. Iteration can stop at any item and resume later without losing the
//! rest of the current page.

use crate::client::adapter::{RequestAdapter, RequestAdapterExt};
use crate::client::error_mapping::ErrorMapping;
use crate::error::Result;
use crate::models::CollectionResponse;
use crate::protocol::constants::{headers, media_types};
use crate::protocol::RequestHeaders;
use crate::request::RequestInformation;
use crate::serialization::ParsableFactory;
use crate::types::PathParameters;
use futures::Stream;
use http::Method;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A page of a paged collection.
pub trait CollectionPage: Send + 'static {
    type Item: Send + 'static;

    fn next_link(&self) -> Option<&str>;

    /// Only present on the last page of a delta query.
    fn delta_link(&self) -> Option<&str> {
        None
    }

    fn into_items(self) -> Vec<Self::Item>;
}

impl<T: Send + 'static> CollectionPage for CollectionResponse<T> {
    type Item = T;

    fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref()
    }

    fn delta_link(&self) -> Option<&str> {
        self.delta_link.as_deref()
    }

    fn into_items(self) -> Vec<T> {
        self.value
    }
}

/// Walks every item of a paged collection.
///
/// # Examples
///
/// ```ignore
/// let first = adapter.send(info, create_user_collection_response, Some(&errors)).await?;
/// let mut pages = PageIterator::new(first.unwrap_or_default(), adapter.clone(), create_user_collection_response)
///     .with_error_mapping(errors);
/// pages.iterate(|user| {
///     println!("{:?}", user);
///     true
/// }).await?;
/// ```
pub struct PageIterator<P: CollectionPage> {
    adapter: Arc<dyn RequestAdapter>,
    factory: ParsableFactory<P>,
    error_mapping: Option<ErrorMapping>,
    headers: RequestHeaders,
    cancellation: Option<CancellationToken>,
    buffer: VecDeque<P::Item>,
    next_link: Option<String>,
    delta_link: Option<String>,
}

impl<P: CollectionPage> PageIterator<P> {
    pub fn new(first_page: P, adapter: Arc<dyn RequestAdapter>, factory: ParsableFactory<P>) -> Self {
        let mut default_headers = RequestHeaders::new();
        default_headers.add(headers::ACCEPT, media_types::JSON);
        let mut iterator = PageIterator {
            adapter,
            factory,
            error_mapping: None,
            headers: default_headers,
            cancellation: None,
            buffer: VecDeque::new(),
            next_link: None,
            delta_link: None,
        };
        iterator.load(first_page);
        iterator
    }

    /// Error mapping applied to every follow-up page.
    #[must_use]
    pub fn with_error_mapping(mut self, error_mapping: ErrorMapping) -> Self {
        self.error_mapping = Some(error_mapping);
        self
    }

    /// Headers sent with every follow-up page, replacing the default `Accept`.
    #[must_use]
    pub fn with_headers(mut self, headers: RequestHeaders) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Link to the page that will be fetched next.
    pub fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref()
    }

    /// Delta link from the last page, once reached.
    pub fn delta_link(&self) -> Option<&str> {
        self.delta_link.as_deref()
    }

    fn load(&mut self, page: P) {
        self.next_link = page.next_link().filter(|link| !link.is_empty()).map(str::to_string);
        if let Some(delta) = page.delta_link() {
            self.delta_link = Some(delta.to_string());
        }
        self.buffer.extend(page.into_items());
    }

    /// Fetch the next page into the buffer.
    ///
    /// Returns `false` once there is no next link.
    async fn fetch(&mut self) -> Result<bool> {
        let Some(link) = self.next_link.take() else {
            return Ok(false);
        };
        let mut info = RequestInformation::new(Method::GET, "{+baseurl}", PathParameters::new());
        info.set_uri(link);
        info.headers.add_all(&self.headers);
        if let Some(token) = &self.cancellation {
            info.set_cancellation_token(token.clone());
        }

        match self
            .adapter
            .send(info, self.factory, self.error_mapping.as_ref())
            .await?
        {
            Some(page) => self.load(page),
            None => self.next_link = None,
        }
        Ok(true)
    }

    /// The next item, fetching pages as needed.
    pub async fn next_item(&mut self) -> Result<Option<P::Item>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            if !self.fetch().await? {
                return Ok(None);
            }
        }
    }

    /// The rest of the current page, or the next page when it is exhausted.
    ///
    /// Returns `None` after the last page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<P::Item>>> {
        while self.buffer.is_empty() {
            if !self.fetch().await? {
                return Ok(None);
            }
        }
        Ok(Some(self.buffer.drain(..).collect()))
    }

    /// Hand each item to `callback` until it returns `false` or the collection
    /// ends. Calling again resumes after the last item handed out.
    pub async fn iterate<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(P::Item) -> bool + Send,
    {
        while let Some(item) = self.next_item().await? {
            if !callback(item) {
                break;
            }
        }
        Ok(())
    }

    /// All items as a stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<P::Item>> + Send {
        futures::stream::try_unfold(self, |mut pages| async move {
            Ok(pages.next_item().await?.map(|item| (item, pages)))
        })
    }
}

impl<P: CollectionPage> std::fmt::Debug for PageIterator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageIterator")
            .field("buffered", &self.buffer.len())
            .field("next_link", &self.next_link)
            .field("delta_link", &self.delta_link)
            .finish()
    }
}
