// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Personalized recommendations from the external service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::warn;

use cinebot_core::CinebotError;

use crate::recommender::{RecommendationReply, RecommendationSource};
use crate::tool::{Tool, ToolContext, ToolId, ToolOutcome};

pub const SIGN_IN_REQUIRED: &str =
    "Vui lòng đăng nhập để tôi có thể đưa ra đề xuất phim dựa trên lịch sử xem phim của bạn.";

pub const RECOMMENDATION_FAILED: &str = "Đã xảy ra lỗi khi cố gắng tạo đề xuất phim cho bạn.";

pub struct RecommendationsTool {
    source: Arc<dyn RecommendationSource>,
}

impl RecommendationsTool {
    pub fn new(source: Arc<dyn RecommendationSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for RecommendationsTool {
    fn id(&self) -> ToolId {
        ToolId::GetMovieRecommendationsBasedOnHistory
    }

    fn description(&self) -> &str {
        "Đề xuất phim dựa trên lịch sử xem phim, sở thích thể loại, và hành vi của người dùng tương tự. \
         Chỉ gọi khi user hỏi chung chung như 'đề xuất phim', 'phim nào hay', 'nên xem gì'. \
         Không cần tham số đầu vào từ user."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: &Value, ctx: &ToolContext) -> Result<ToolOutcome, CinebotError> {
        let Some(caller) = &ctx.caller else {
            return Ok(ToolOutcome::Clarification(SIGN_IN_REQUIRED.to_string()));
        };
        Ok(match self.source.recommend(caller.user_id).await {
            Ok(RecommendationReply::Movies(movies)) => ToolOutcome::Rows(movies),
            Ok(RecommendationReply::Message(message)) => ToolOutcome::Clarification(message),
            Ok(RecommendationReply::Error(message)) => ToolOutcome::Failure(message),
            Err(e) => {
                warn!(user_id = caller.user_id, error = %e, "recommendation service failed");
                ToolOutcome::Failure(RECOMMENDATION_FAILED.to_string())
            }
        })
    }
}
