//! Access control list middleware for the storefront server.
//! This middleware can be placed on any route or scope that sits inside the JWT middleware.
//!
//! It checks the claims that the JWT middleware left in the request extensions against the required roles for the
//! route. If the caller has every required role, the request continues. Otherwise, a 403 Forbidden response is
//! returned.
use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use storefront_engine::db_types::Role;

use crate::{
    auth::JwtClaims,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let jwt_claims = req.extensions().get::<JwtClaims>().cloned();
            let Some(jwt_claims) = jwt_claims else {
                log::warn!("🔐️ No JWT claims found in request extensions for {}", req.path());
                return Err(ServerError::AuthenticationError(AuthError::MissingToken).into());
            };
            if jwt_claims.has_roles(&required_roles) {
                service.call(req).await
            } else {
                log::info!("🔐️ {} tried to access {} without the required roles", jwt_claims.sub, req.path());
                Err(ServerError::InsufficientPermissions(format!("{} requires {required_roles:?}", req.path())).into())
            }
        })
    }
}
