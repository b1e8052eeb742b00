use jsonwebtoken::DecodingKey;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub decoding_key: DecodingKey,
}

impl AppState {
    pub fn new(db: PgPool, jwt_secret: &str) -> Self {
        Self {
            db,
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }
}
