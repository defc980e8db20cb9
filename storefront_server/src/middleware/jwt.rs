//! Bearer token middleware.
//!
//! Validates the `Authorization: Bearer` token on every request in the wrapped scope and leaves the resulting
//! [`JwtClaims`] in the request extensions, where the ACL middleware and the route handlers pick them up. Requests
//! without a valid token are rejected before they reach any handler.
use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    auth::{bearer_token, TokenIssuer},
    errors::{AuthError, ServerError},
};

pub struct JwtMiddlewareFactory {
    issuer: Arc<TokenIssuer>,
}

impl JwtMiddlewareFactory {
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = JwtMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareService { issuer: Arc::clone(&self.issuer), service: Rc::new(service) }))
    }
}

pub struct JwtMiddlewareService<S> {
    issuer: Arc<TokenIssuer>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let claims = match bearer_token(req.request()) {
            Some(token) => self.issuer.validate_token(token),
            None => Err(AuthError::MissingToken),
        };
        Box::pin(async move {
            match claims {
                Ok(claims) => {
                    trace!("🔐️ Request to {} authenticated as {}", req.path(), claims.sub);
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                },
                Err(e) => {
                    debug!("🔐️ Rejected request to {}. {e}", req.path());
                    Err(ServerError::AuthenticationError(e).into())
                },
            }
        })
    }
}
