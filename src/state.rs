use crate::crypto::TranscriptCipher;
use crate::services::email::EmailService;
use crate::services::voice::VoiceClient;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cipher: Arc<TranscriptCipher>,
    pub voice: VoiceClient,
    pub email: EmailService,
    pub session_key: Vec<u8>,
    pub app_base_url: String,
}

pub type SharedState = Arc<AppState>;
