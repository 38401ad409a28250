// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System prompts for the two dialogue stages.

use cinebot_config::model::AgentConfig;
use cinebot_storage::CatalogSnapshot;
use tracing::{info, warn};

/// Display name used for guests.
pub const GUEST_NAME: &str = "Khách";

/// Instructions for the confirmation stage. The model may only answer with
/// one of three JSON shapes.
pub const CONFIRMATION_PROMPT: &str = r#"Nhiệm vụ duy nhất của bạn là trích xuất lựa chọn suất chiếu.
Tin nhắn trợ lý gần nhất đã liệt kê các suất chiếu, tin nhắn cuối cùng của người dùng cho biết họ chọn suất nào.

Chỉ trả lời bằng MỘT đối tượng JSON, không thêm bất kỳ chữ nào khác:
- Chọn theo số thứ tự ("suất 2", "cái thứ hai"): {"choice_index": 2} (đếm từ 1).
- Chọn theo giờ ("suất 13:45", "1:45 chiều"): {"choice_time": "13:45"} (định dạng HH:mm, 24 giờ).
- Từ chối ("thôi", "không đặt nữa"): {"choice_index": -1}.

Ví dụ:
User: "cho tôi suất 10:00" -> {"choice_time": "10:00"}
User: "suất đầu tiên" -> {"choice_index": 1}
User: "thôi để lúc khác" -> {"choice_index": -1}"#;

const RULES: &str = r#"**CÁCH LÀM VIỆC:**
1. Khi người dùng hỏi suất chiếu, phim tại rạp, thông tin phim, đề xuất phim hoặc quy định của rạp, hãy gọi tool tương ứng qua `tool_calls`. Không bao giờ viết tên hàm hay mã vào câu trả lời.
2. Ghi nhớ bối cảnh: khi người dùng bổ sung một chi tiết (ví dụ "ngày 15-11"), hãy gộp nó với phim, rạp, thành phố đã nhắc ở các tin nhắn trước rồi gọi lại tool với đầy đủ thông tin.
3. Khi đặt vé, đừng hỏi tên hay số điện thoại. Hãy hỏi phim gì, rạp nào, ngày nào.
4. Khi liệt kê suất chiếu, đánh số từng suất, ghi giờ chiếu, giá vé và định dạng (2D, 3D, IMAX...) nếu có, rồi kết thúc bằng câu "Bạn muốn chọn suất nào?".

**CHỐNG BỊA ĐẶT:**
- Không bao giờ tự nghĩ ra suất chiếu. Chưa gọi tool thì không được nói "tôi đã tìm thấy".
- Nếu tool trả về danh sách rỗng hoặc một thông báo (`{"message": ...}`, `{"error": ...}`), hãy báo lại đúng nội dung đó.
- Bạn không chốt vé. Khi người dùng chọn một suất cụ thể, hệ thống sẽ xử lý việc đó."#;

/// Loads the header override from `agent.system_prompt_file`, if configured
/// and readable. Falls back to the built-in persona on any failure.
pub async fn load_prompt_header(config: &AgentConfig) -> Option<String> {
    let path = config.system_prompt_file.as_deref()?;
    match tokio::fs::read_to_string(path).await {
        Ok(content) if !content.trim().is_empty() => {
            info!(path = %path, "loaded system prompt header from file");
            Some(content.trim().to_string())
        }
        Ok(_) => {
            warn!(path = %path, "system prompt file is empty, using built-in persona");
            None
        }
        Err(e) => {
            warn!(path = %path, error = %e, "failed to read system prompt file, using built-in persona");
            None
        }
    }
}

fn listing(items: &[String]) -> String {
    if items.is_empty() {
        "(chưa có dữ liệu)".to_string()
    } else {
        items.join(", ")
    }
}

/// Prompt for the discovery stage.
pub fn discovery_prompt(
    agent_name: &str,
    header: Option<&str>,
    caller_name: Option<&str>,
    snapshot: &CatalogSnapshot,
) -> String {
    let header = match header {
        Some(h) => h.to_string(),
        None => format!(
            "Bạn là \"{agent_name}\", trợ lý đặt vé xem phim chuyên nghiệp và thân thiện của rạp CGV."
        ),
    };
    format!(
        "{header}\nBạn đang nói chuyện với {caller}.\n\n\
         **DỮ LIỆU HIỆN CÓ (chỉ dùng để đối chiếu tên):**\n\
         * Phim đang chiếu: {movies}\n\
         * Thành phố: {cities}\n\
         * Rạp: {cinemas}\n\n\
         {RULES}",
        caller = caller_name.unwrap_or(GUEST_NAME),
        movies = listing(&snapshot.now_showing),
        cities = listing(&snapshot.cities),
        cinemas = listing(&snapshot.cinemas),
    )
}
