// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword search over cinema regulations and payment policies.

use async_trait::async_trait;
use serde_json::{Value, json};

use cinebot_core::CinebotError;
use cinebot_storage::Database;
use cinebot_storage::queries::catalog::search_policies;

use crate::tool::{Tool, ToolContext, ToolId, ToolOutcome, str_arg};

pub const ASK_QUERY: &str = "Bạn muốn tra cứu quy định hoặc chính sách nào?";

const MAX_RESULTS: u32 = 5;

pub struct PolicySearchTool {
    db: Database,
}

impl PolicySearchTool {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for PolicySearchTool {
    fn id(&self) -> ToolId {
        ToolId::SearchCgvPolicies
    }

    fn description(&self) -> &str {
        "Tra cứu thông tin về: Quy định chung (regulations) và Chính sách thanh toán (payment policy) của CGV. \
         Dùng khi user hỏi về: quy định rạp, mang đồ ăn, hoàn vé, phương thức thanh toán, lỗi trừ tiền, vé trẻ em, thú cưng..."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Câu hỏi hoặc từ khóa chính. Ví dụ: 'thú cưng', 'hoàn tiền vé online'"
                }
            }
        })
    }

    async fn execute(&self, args: &Value, _ctx: &ToolContext) -> Result<ToolOutcome, CinebotError> {
        let Some(query) = str_arg(args, "query") else {
            return Ok(ToolOutcome::Clarification(ASK_QUERY.to_string()));
        };
        let words = query.split_whitespace().map(str::to_string).collect();
        let rows = search_policies(&self.db, words, MAX_RESULTS).await?;
        if rows.is_empty() {
            return Ok(ToolOutcome::Empty(format!(
                "Không tìm thấy quy định nào liên quan đến '{query}'."
            )));
        }
        ToolOutcome::rows(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::guest_at_morning;
    use cinebot_storage::queries::catalog::insert_policy;

    async fn tool() -> PolicySearchTool {
        let db = Database::open_in_memory().await.unwrap();
        insert_policy(
            &db,
            "regulation",
            "Thú cưng",
            "Khách hàng không được mang thú cưng vào rạp.",
        )
        .await
        .unwrap();
        for i in 0..7 {
            insert_policy(&db, "payment", &format!("Thanh toán {i}"), "Hỗ trợ thẻ ATM và ví điện tử.")
                .await
                .unwrap();
        }
        PolicySearchTool::new(db)
    }

    #[tokio::test]
    async fn every_word_must_match() {
        let outcome = tool()
            .await
            .execute(&json!({"query": "mang THÚ CƯNG"}), &guest_at_morning())
            .await
            .unwrap();
        let ToolOutcome::Rows(rows) = outcome else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["category"], "regulation");
    }

    #[tokio::test]
    async fn results_are_capped() {
        let ToolOutcome::Rows(rows) = tool()
            .await
            .execute(&json!({"query": "thanh toán"}), &guest_at_morning())
            .await
            .unwrap()
        else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 5);
    }

    #[tokio::test]
    async fn no_match_and_missing_query() {
        let t = tool().await;
        assert_eq!(
            t.execute(&json!({"query": "bỏng ngô"}), &guest_at_morning())
                .await
                .unwrap(),
            ToolOutcome::Empty("Không tìm thấy quy định nào liên quan đến 'bỏng ngô'.".into())
        );
        assert_eq!(
            t.execute(&json!({"query": "  "}), &guest_at_morning()).await.unwrap(),
            ToolOutcome::Clarification(ASK_QUERY.into())
        );
    }
}
