//! Outgoing request description and the decorator chain applied to it
//! before dispatch.

use crate::system::session::Session;

/// GET-запрос к API до отправки
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Set a header, replacing an earlier value with the same name
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub trait RequestDecorator {
    fn decorate(&self, request: ApiRequest) -> ApiRequest;
}

impl<F> RequestDecorator for F
where
    F: Fn(ApiRequest) -> ApiRequest,
{
    fn decorate(&self, request: ApiRequest) -> ApiRequest {
        self(request)
    }
}

/// `Accept: application/json`
pub struct AcceptJson;

impl RequestDecorator for AcceptJson {
    fn decorate(&self, request: ApiRequest) -> ApiRequest {
        request.with_header("Accept", "application/json")
    }
}

/// `Authorization: Bearer <token>` while the session holds a token
pub struct BearerAuth {
    session: Session,
}

impl BearerAuth {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl RequestDecorator for BearerAuth {
    fn decorate(&self, request: ApiRequest) -> ApiRequest {
        match self.session.token() {
            Some(token) => request.with_header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

/// Декораторы применяются по порядку добавления
#[derive(Default)]
pub struct DecoratorChain {
    decorators: Vec<Box<dyn RequestDecorator>>,
}

impl DecoratorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, decorator: impl RequestDecorator + 'static) -> Self {
        self.decorators.push(Box::new(decorator));
        self
    }

    pub fn apply(&self, request: ApiRequest) -> ApiRequest {
        self.decorators
            .iter()
            .fold(request, |req, decorator| decorator.decorate(req))
    }

    /// Accept JSON, then bearer auth from `session`
    pub fn standard(session: &Session) -> Self {
        Self::new()
            .with(AcceptJson)
            .with(BearerAuth::new(session.clone()))
    }
}
