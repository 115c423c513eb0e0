//! Canned replies used when every generation tier failed.

use crate::models::chat::Message;

/// Phrases meaning "what did I ask earlier"
pub const RECALL_KEYWORDS: [&str; 8] = [
    "之前", "刚才", "上面", "之前问", "刚问", "之前聊", "刚才说", "刚刚问",
];

const RECALLED_QUESTIONS: usize = 2;

const GENERIC_APOLOGY: &str = "很抱歉，我目前遇到了一些技术问题，无法处理您的请求。这可能是由于以下原因：

1. 服务器负载过高
2. API调用限制
3. 网络连接问题

请稍后再试，或者重新表述您的问题，我会尽力帮助您。如果问题持续存在，请联系技术支持。

感谢您的理解。";

pub fn is_recall_question(question: &str) -> bool {
    RECALL_KEYWORDS.iter().any(|keyword| question.contains(keyword))
}

/// Build the fallback reply. Never fails.
pub fn fallback_response(question: &str, history: &[Message]) -> String {
    if is_recall_question(question) && !history.is_empty() {
        let mut recalled: Vec<&str> = history
            .iter()
            .rev()
            .filter(|msg| msg.is_user())
            .take(RECALLED_QUESTIONS)
            .map(|msg| msg.content.as_str())
            .collect();

        if !recalled.is_empty() {
            recalled.reverse();
            let summary = recalled.join("、");
            return format!(
                "根据我的记忆，您之前问了关于\"{}\"的问题。\n\n很抱歉，我目前遇到了一些技术问题，无法提供完整的回答。请稍后再试，或者重新表述您的问题，我会尽力帮助您。",
                summary
            );
        }
    }

    GENERIC_APOLOGY.to_string()
}
