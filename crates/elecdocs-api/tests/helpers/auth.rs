use elecdocs_api::auth::JwtClaims;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

fn token_with(uid: &str, email: &str, exp_offset_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: uid.to_string(),
        email: Some(email.to_string()),
        exp: now + exp_offset_secs,
        iat: Some(now),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

pub fn token_for(uid: &str, email: &str) -> String {
    token_with(uid, email, 3600)
}

pub fn expired_token(uid: &str, email: &str) -> String {
    token_with(uid, email, -3600)
}

pub fn technician_token() -> String {
    token_for("tech-1", "tech@example.com")
}

pub fn admin_token() -> String {
    token_for("lead-1", super::ADMIN_EMAIL)
}

pub fn second_admin_token() -> String {
    token_for("deputy-1", super::SECOND_ADMIN_EMAIL)
}
