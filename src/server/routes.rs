//! ルーティング定義

use warp::{Filter, Rejection, Reply};

use super::error::handle_rejection;
use super::handlers;
use crate::service::AnalysisService;

/// リクエストボディの上限
const MAX_BODY_BYTES: u64 = 1024 * 1024;

fn with_service(
    service: AnalysisService,
) -> impl Filter<Extract = (AnalysisService,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || service.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// 全ルート（CORS・エラー変換込み）
pub fn routes(
    service: AnalysisService,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    home()
        .or(text_routes(service.clone()))
        .or(conversation_routes(service.clone()))
        .or(record_routes(service.clone()))
        .or(analytics_routes(service))
        .recover(handle_rejection)
        .with(cors)
        .with(warp::trace::request())
}

fn home() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).and_then(handlers::home)
}

/// /api/analyze, /api/predict
fn text_routes(
    service: AnalysisService,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let usage = warp::path!("api" / "analyze")
        .and(warp::get())
        .and_then(handlers::analyze_usage);

    let analyze = warp::path!("api" / "analyze")
        .and(warp::post())
        .and(json_body())
        .and(with_service(service.clone()))
        .and_then(handlers::analyze_text);

    let predict = warp::path!("api" / "predict")
        .and(warp::post())
        .and(json_body())
        .and(with_service(service))
        .and_then(handlers::predict_top_emotion);

    usage.or(analyze).or(predict)
}

/// /api/conversations 以下
fn conversation_routes(
    service: AnalysisService,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("api" / "conversations")
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(handlers::list_conversations);

    let create = warp::path!("api" / "conversations")
        .and(warp::post())
        .and(json_body())
        .and(with_service(service.clone()))
        .and_then(handlers::create_conversation);

    let detail = warp::path!("api" / "conversations" / i64)
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(handlers::get_conversation);

    let analyze = warp::path!("api" / "conversations" / i64 / "analyze")
        .and(warp::post())
        .and(with_service(service.clone()))
        .and_then(handlers::analyze_conversation);

    let messages = warp::path!("api" / "conversations" / i64 / "messages")
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(handlers::get_conversation_messages);

    let analysis = warp::path!("api" / "conversations" / i64 / "analysis")
        .and(warp::get())
        .and(with_service(service))
        .and_then(handlers::get_conversation_analysis);

    list.or(create)
        .or(detail)
        .or(analyze)
        .or(messages)
        .or(analysis)
}

/// /api/messages/{id}, /api/analysis/{id}
fn record_routes(
    service: AnalysisService,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let message = warp::path!("api" / "messages" / i64)
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(handlers::get_message);

    let analysis = warp::path!("api" / "analysis" / i64)
        .and(warp::get())
        .and(with_service(service))
        .and_then(handlers::get_analysis);

    message.or(analysis)
}

/// /api/analytics 以下
fn analytics_routes(
    service: AnalysisService,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let emotions = warp::path!("api" / "analytics" / "emotions")
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(handlers::emotion_analytics);

    let compliance = warp::path!("api" / "analytics" / "compliance")
        .and(warp::get())
        .and(with_service(service))
        .and_then(handlers::compliance_analytics);

    emotions.or(compliance)
}
