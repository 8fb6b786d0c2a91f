use axum::Json;
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ServiceError;
use crate::result::ApiResponse;

// 地球平均半径（千米）
const EARTH_RADIUS_KM: f64 = 6371.0;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// bcrypt 计算量大，放到阻塞线程池执行
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| ServiceError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| ServiceError::Internal(format!("failed to hash password: {e}")))
}

pub async fn verify_password_blocking(
    password: String,
    hash: String,
) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Internal(format!("verification task failed: {e}")))?
        .map_err(|e| ServiceError::Internal(format!("failed to verify password: {e}")))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    pub exp: i64,    // 过期时间
    pub iat: i64,    // 签发时间
}

/// 经过认证的调用者，由认证中间件写入请求扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: Uuid,
}

impl Claims {
    pub fn current_user(&self) -> Result<CurrentUser, ServiceError> {
        let user_id = Uuid::parse_str(&self.sub).map_err(|_| ServiceError::Unauthenticated)?;
        Ok(CurrentUser { user_id })
    }
}

pub fn generate_token(
    user_id: Uuid,
    config: &Config,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = (now + Duration::seconds(config.jwt_expiration().as_secs() as i64)).timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Haversine 球面距离，单位千米
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn within_radius(lat: f64, lon: f64, center_lat: f64, center_lon: f64, radius_km: f64) -> bool {
    calculate_distance(center_lat, center_lon, lat, lon) <= radius_km
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const CONFLICT: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const BAD_REQUEST: i32 = 1006;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_between_identical_points_is_zero() {
        assert!(calculate_distance(40.0, -73.0, 40.0, -73.0).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = calculate_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn distance_wraps_the_antimeridian() {
        let d = calculate_distance(0.0, 179.9, 0.0, -179.9);
        assert!(d < 23.0, "got {d}");
    }

    #[test]
    fn radius_check_uses_great_circle_distance() {
        assert!(within_radius(0.0, 0.0, 0.0, 0.0, 1.0));
        assert!(!within_radius(10.0, 10.0, 0.0, 0.0, 1.0));
        // 高纬度下经度差对应的距离更短
        assert!(within_radius(80.0, 1.0, 80.0, 0.0, 20.0));
        assert!(!within_radius(0.0, 1.0, 0.0, 0.0, 20.0));
    }

    #[test]
    fn token_round_trips_subject() {
        let config = Config::local("test-secret");
        let user_id = Uuid::new_v4();
        let (token, exp) = generate_token(user_id, &config).unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.current_user().unwrap().user_id, user_id);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let (token, _) = generate_token(Uuid::new_v4(), &Config::local("one")).unwrap();
        assert!(verify_token(&token, &Config::local("two")).is_err());
    }

    #[tokio::test]
    async fn blocking_hash_verifies() {
        let hashed = hash_password_blocking("hunter22".into(), 4).await.unwrap();
        assert!(verify_password_blocking("hunter22".into(), hashed.clone()).await.unwrap());
        assert!(!verify_password_blocking("hunter23".into(), hashed).await.unwrap());
    }
}
