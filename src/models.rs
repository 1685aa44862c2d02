use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct RegisterReq {
    pub username: String,
    pub password: String,
    pub role_id: i16,
    pub institution_id: Option<Uuid>,
    pub employee_id: Option<String>,
    pub full_name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginReqDto {
    pub username: String,
    pub password: String,
}

#[derive(FromRow)]
pub struct UserSql {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub role_id: i16,
    pub institution_id: Option<Uuid>,
    pub employee_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub sub: String,
    pub role: i16, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Tenant the user belongs to; absent only for platform-level accounts
    pub institution_id: Option<Uuid>,
    /// Present only if this user carries an employee number
    pub employee_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
