use crate::config::Config;
use crate::error::ApiError;
use crate::{model::role::Role, models::Claims};
use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::decode;
use jsonwebtoken::{DecodingKey, Validation};
use uuid::Uuid;

pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,

    /// Tenant of the caller; absent only for platform-level accounts
    pub institution_id: Option<Uuid>,
    /// Present only if this user carries an employee number
    pub employee_id: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ApiError::Auth("Missing token".into()).into())),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ApiError::Upstream.into())),
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ApiError::Auth("Invalid token".into()).into())),
        };

        let role = match Role::from_id(data.claims.role) {
            Some(r) => r,
            None => return ready(Err(ApiError::Auth("Invalid role".into()).into())),
        };

        ready(Ok(AuthUser {
            user_id: data.claims.user_id,
            username: data.claims.sub,
            role,
            institution_id: data.claims.institution_id,
            employee_id: data.claims.employee_id,
        }))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin only".into()))
        }
    }

    pub fn require_institution_admin(&self) -> Result<(), ApiError> {
        if matches!(self.role, Role::Admin | Role::InstitutionAdmin) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Institution admin only".into()))
        }
    }

    /// Sweep and other operational endpoints: admins or the scheduler account
    pub fn require_operator(&self) -> Result<(), ApiError> {
        if matches!(self.role, Role::Admin | Role::InstitutionAdmin | Role::System) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Operator only".into()))
        }
    }

    /// Card readers authenticate with a device account
    pub fn require_device(&self) -> Result<(), ApiError> {
        if matches!(self.role, Role::Device | Role::System | Role::Admin) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Device account only".into()))
        }
    }

    /// Every tenant-scoped query filters on this id
    pub fn institution(&self) -> Result<Uuid, ApiError> {
        self.institution_id
            .ok_or_else(|| ApiError::Forbidden("No institution membership".into()))
    }

    /// Returns true if the user is a regular staff member
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }
}
