use mastery_backend::auth::sign_jwt_for_user;
use mastery_backend::config::Config;

/// Mints a valid learner token straight from the test config's secret;
/// there is no registration flow in this service.
pub fn user_token(config: &Config, user_id: &str) -> String {
    sign_jwt_for_user(user_id, &config.jwt_secret, config.jwt_expires_in_hours)
        .expect("sign test token")
}

pub fn auth_header(token: &str) -> String {
    format!("Bearer {token}")
}
