//! Request filters
//!
//! A filter is a named hook with an explicit kind, so the order and side
//! effects of a chain can be read off its contents:
//!
//! - [`FilterKind::ObserveRequest`] sees the outgoing request, read-only
//! - [`FilterKind::MutateRequest`] may rewrite the outgoing request
//! - [`FilterKind::ObserveResponse`] sees the request and the response
//!
//! Engines run request hooks in chain order before sending and response
//! hooks in chain order after receiving. Nothing short-circuits.

use crate::message::{HttpRequest, HttpResponse};
use std::fmt;
use std::sync::Arc;

type ObserveRequestFn = dyn Fn(&HttpRequest) + Send + Sync;
type MutateRequestFn = dyn Fn(&mut HttpRequest) + Send + Sync;
type ObserveResponseFn = dyn Fn(&HttpRequest, &HttpResponse) + Send + Sync;

/// Filter kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    ObserveRequest,
    MutateRequest,
    ObserveResponse,
}

#[derive(Clone)]
enum Hook {
    ObserveRequest(Arc<ObserveRequestFn>),
    MutateRequest(Arc<MutateRequestFn>),
    ObserveResponse(Arc<ObserveResponseFn>),
}

/// A request filter handle
///
/// Cloning a filter clones the handle, not the hook: every clone calls the
/// same closure.
#[derive(Clone)]
pub struct RequestFilter {
    name: String,
    hook: Hook,
}

impl RequestFilter {
    pub fn observe_request<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HttpRequest) + Send + Sync + 'static,
    {
        RequestFilter {
            name: name.into(),
            hook: Hook::ObserveRequest(Arc::new(f)),
        }
    }

    pub fn mutate_request<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut HttpRequest) + Send + Sync + 'static,
    {
        RequestFilter {
            name: name.into(),
            hook: Hook::MutateRequest(Arc::new(f)),
        }
    }

    pub fn observe_response<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HttpRequest, &HttpResponse) + Send + Sync + 'static,
    {
        RequestFilter {
            name: name.into(),
            hook: Hook::ObserveResponse(Arc::new(f)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FilterKind {
        match self.hook {
            Hook::ObserveRequest(_) => FilterKind::ObserveRequest,
            Hook::MutateRequest(_) => FilterKind::MutateRequest,
            Hook::ObserveResponse(_) => FilterKind::ObserveResponse,
        }
    }

    /// Whether both handles call the same hook
    pub fn same_hook(&self, other: &RequestFilter) -> bool {
        match (&self.hook, &other.hook) {
            (Hook::ObserveRequest(a), Hook::ObserveRequest(b)) => Arc::ptr_eq(a, b),
            (Hook::MutateRequest(a), Hook::MutateRequest(b)) => Arc::ptr_eq(a, b),
            (Hook::ObserveResponse(a), Hook::ObserveResponse(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for RequestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestFilter")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Ordered, append-only list of filters
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<RequestFilter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter; it runs after every filter already in the chain
    pub fn push(&mut self, filter: RequestFilter) {
        self.filters.push(filter);
    }

    pub fn as_slice(&self) -> &[RequestFilter] {
        &self.filters
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestFilter> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run the request hooks, in order, against an outgoing request
    pub fn before_send(&self, request: &mut HttpRequest) {
        for filter in &self.filters {
            match &filter.hook {
                Hook::ObserveRequest(f) => {
                    tracing::trace!(filter = %filter.name, "observe request");
                    f(request);
                }
                Hook::MutateRequest(f) => {
                    tracing::trace!(filter = %filter.name, "mutate request");
                    f(request);
                }
                Hook::ObserveResponse(_) => {}
            }
        }
    }

    /// Run the response hooks, in order, once a response has arrived
    pub fn after_receive(&self, request: &HttpRequest, response: &HttpResponse) {
        for filter in &self.filters {
            if let Hook::ObserveResponse(f) = &filter.hook {
                tracing::trace!(filter = %filter.name, "observe response");
                f(request, response);
            }
        }
    }
}

impl From<Vec<RequestFilter>> for FilterChain {
    fn from(filters: Vec<RequestFilter>) -> Self {
        FilterChain { filters }
    }
}

impl FromIterator<RequestFilter> for FilterChain {
    fn from_iter<T: IntoIterator<Item = RequestFilter>>(iter: T) -> Self {
        FilterChain {
            filters: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FilterChain {
    type Item = &'a RequestFilter;
    type IntoIter = std::slice::Iter<'a, RequestFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}
