//! HTTPリクエストハンドラー

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

use super::error::error_reply;
use crate::compliance::MessageRecord;
use crate::errors::VoiceupResult;
use crate::service::AnalysisService;

/// `{text}`形式のリクエスト
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

impl TextRequest {
    fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// 会話作成リクエスト
#[derive(Debug, Clone, Deserialize)]
pub struct CreateConversationRequest {
    pub messages: Vec<MessageRecord>,
}

fn respond<T: Serialize>(result: VoiceupResult<T>) -> Result<Response, Infallible> {
    Ok(match result {
        Ok(value) => warp::reply::json(&value).into_response(),
        Err(e) => error_reply(&e),
    })
}

pub async fn home() -> Result<Response, Infallible> {
    Ok(warp::reply::json(&json!({ "message": "Welcome to the VoiceUp API!" })).into_response())
}

pub async fn analyze_usage() -> Result<Response, Infallible> {
    Ok(warp::reply::json(&json!({ "message": "Send a POST request with text to analyze." }))
        .into_response())
}

pub async fn analyze_text(
    request: TextRequest,
    service: AnalysisService,
) -> Result<Response, Infallible> {
    respond(
        service
            .analyze_text(request.text())
            .await
            .map(|summary| summary.emotions),
    )
}

pub async fn predict_top_emotion(
    request: TextRequest,
    service: AnalysisService,
) -> Result<Response, Infallible> {
    respond(service.predict_top_emotion(request.text()).await)
}

pub async fn list_conversations(service: AnalysisService) -> Result<Response, Infallible> {
    respond(service.list_conversations().await)
}

pub async fn create_conversation(
    request: CreateConversationRequest,
    service: AnalysisService,
) -> Result<Response, Infallible> {
    match service.ingest_conversation(&request.messages).await {
        Ok(detail) => {
            tracing::info!(
                conversation_id = detail.id,
                messages = detail.messages.len(),
                "📥 Conversation created"
            );
            Ok(warp::reply::with_status(warp::reply::json(&detail), StatusCode::CREATED)
                .into_response())
        }
        Err(e) => Ok(error_reply(&e)),
    }
}

pub async fn get_conversation(
    conversation_id: i64,
    service: AnalysisService,
) -> Result<Response, Infallible> {
    respond(service.get_conversation_detail(conversation_id).await)
}

pub async fn analyze_conversation(
    conversation_id: i64,
    service: AnalysisService,
) -> Result<Response, Infallible> {
    respond(service.analyze_conversation(conversation_id).await)
}

pub async fn get_conversation_messages(
    conversation_id: i64,
    service: AnalysisService,
) -> Result<Response, Infallible> {
    respond(service.get_conversation_messages(conversation_id).await)
}

pub async fn get_conversation_analysis(
    conversation_id: i64,
    service: AnalysisService,
) -> Result<Response, Infallible> {
    respond(service.get_conversation_analysis(conversation_id).await)
}

pub async fn get_message(
    message_id: i64,
    service: AnalysisService,
) -> Result<Response, Infallible> {
    respond(service.get_message(message_id).await)
}

pub async fn get_analysis(
    analysis_id: i64,
    service: AnalysisService,
) -> Result<Response, Infallible> {
    respond(service.get_analysis(analysis_id).await)
}

pub async fn emotion_analytics(service: AnalysisService) -> Result<Response, Infallible> {
    respond(service.emotion_analytics().await)
}

pub async fn compliance_analytics(service: AnalysisService) -> Result<Response, Infallible> {
    respond(service.compliance_analytics().await)
}
