use crate::models::chat::{ChatMessage, Message, Role};

use super::composer::RetrievalChunk;
use super::history::{recent, MODEL_CONTEXT_MESSAGES, RAG_HISTORY_MESSAGES};

const SYSTEM_PROMPT: &str = r#"你是一位专业的AI医疗助手，提供准确、科学的医疗健康信息。请注意：
1. 使用Markdown格式组织回答，包括标题、列表、表格等
2. 医学专业术语使用**加粗**或*斜体*并简要解释
3. 健康警告使用> 引用块格式
4. 结构化信息使用清晰的标题层级和列表
5. 重要建议使用加粗标记
6. 你不是医生，不能诊断或提供个人化医疗建议
7. 对于紧急情况，建议用户立即就医

始终保持专业、准确和有帮助的态度。"#;

const MULTIMODAL_SYSTEM_PROMPT: &str = r#"你是一位专业的AI医疗助手，能够结合用户上传的图片（如检查报告、药品包装、皮肤症状照片等）提供医疗健康信息。请注意：
1. 先客观描述图片中与问题相关的内容，再给出解释
2. 使用Markdown格式组织回答
3. 你不是医生，不能根据图片做出诊断，必要时建议用户就医
4. 如果图片内容无法辨认或与医疗无关，请如实说明"#;

const RAG_TEMPLATE: &str = r#"你是一位专业的AI医疗助手，会提供准确、有帮助的医疗健康信息。
请基于以下参考信息、聊天历史（如果有的话）以及你的专业知识回答用户的问题：

参考信息:
{context}

{history_context}

用户问题: {question}

请遵循以下回答规则：
1. 使用Markdown格式化你的回答，使其更易于阅读，例如使用标题、列表、粗体等
2. 如有医学专业术语，可以使用斜体或加粗标记，并简单解释其含义
3. 如果是重要的健康警告或注意事项，请使用引用块标记
4. 如有必要，使用表格呈现对比信息或数据
5. 对于需要强调的内容，可以使用**加粗**格式
6. 提供清晰的结构，使用标题（#、##）分隔不同部分
7. 对于列表类信息，使用有序或无序列表格式展示
8. 如果建议就医，请用**加粗格式**强调
9. 根据聊天历史提供连贯性的回答，避免重复已经提供过的信息

回答时，保持专业、同理心和礼貌，但不要过度承诺医疗效果。始终提醒用户在有疑虑时咨询专业医生。
"#;

const USER_LABEL: &str = "用户";
const ASSISTANT_LABEL: &str = "AI医疗助手";

/// Renders prompts for each generation mode.
pub struct ContextBuilder {
    system_prompt: String,
    multimodal_system_prompt: String,
}

impl ContextBuilder {
    pub fn new(system_prompt: String, multimodal_system_prompt: String) -> Self {
        Self {
            system_prompt,
            multimodal_system_prompt,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// System prompt, last 10 role-tagged turns, then the question.
    pub fn build_direct_messages(&self, history: &[Message], question: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.system_prompt.clone())];
        messages.extend(Self::history_as_chat(recent(history, MODEL_CONTEXT_MESSAGES)));
        messages.push(ChatMessage::user(question));
        messages
    }

    /// System prompt plus a single templated prompt carrying context, history and question.
    pub fn build_rag_messages(
        &self,
        chunks: &[RetrievalChunk],
        history: &[Message],
        question: &str,
    ) -> Vec<ChatMessage> {
        let prompt = RAG_TEMPLATE
            .replace("{context}", &Self::format_context(chunks))
            .replace("{history_context}", &Self::render_history_context(history))
            .replace("{question}", question);

        vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(prompt),
        ]
    }

    /// Vision prompt: text-only history, then an image+text user turn.
    pub fn build_multimodal_messages(
        &self,
        history: &[Message],
        image_url: &str,
        text: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.multimodal_system_prompt.clone())];
        messages.extend(Self::history_as_chat(recent(history, MODEL_CONTEXT_MESSAGES)));
        messages.push(ChatMessage::user_with_image(image_url, text));
        messages
    }

    pub fn format_context(chunks: &[RetrievalChunk]) -> String {
        chunks
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn render_history_context(history: &[Message]) -> String {
        if history.is_empty() {
            return String::new();
        }

        let mut rendered = String::from("\n\n聊天历史:\n");
        for msg in recent(history, RAG_HISTORY_MESSAGES) {
            let label = if msg.is_user() { USER_LABEL } else { ASSISTANT_LABEL };
            rendered.push_str(&format!("{}: {}\n", label, msg.content));
        }
        rendered
    }

    // Only user/assistant turns reach the model; image references are dropped.
    fn history_as_chat(history: &[Message]) -> impl Iterator<Item = ChatMessage> + '_ {
        history.iter().filter_map(|msg| match msg.role {
            Role::User => Some(ChatMessage::user(msg.content.clone())),
            Role::Assistant => Some(ChatMessage::assistant(msg.content.clone())),
            Role::System => None,
        })
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(
            SYSTEM_PROMPT.to_string(),
            MULTIMODAL_SYSTEM_PROMPT.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::MessageContent;

    fn chunk(content: &str) -> RetrievalChunk {
        RetrievalChunk {
            content: content.to_string(),
            similarity: 0.9,
            chunk_index: 0,
        }
    }

    #[test]
    fn test_direct_messages_keep_last_ten_turns() {
        let builder = ContextBuilder::default();
        let history: Vec<Message> = (0..14)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("q{}", i))
                } else {
                    Message::assistant(format!("a{}", i))
                }
            })
            .collect();

        let messages = builder.build_direct_messages(&history, "现在的问题");

        assert_eq!(messages.len(), 12);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].text(), Some("q4"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[11].text(), Some("现在的问题"));
    }

    #[test]
    fn test_direct_messages_skip_system_history() {
        let builder = ContextBuilder::default();
        let mut system_turn = Message::user("ignored");
        system_turn.role = Role::System;

        let messages = builder.build_direct_messages(&[system_turn], "q");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_rag_prompt_contains_context_history_and_question() {
        let builder = ContextBuilder::default();
        let history = vec![Message::user("高血压要注意什么"), Message::assistant("少盐")];
        let chunks = vec![chunk("块一"), chunk("块二")];

        let messages = builder.build_rag_messages(&chunks, &history, "能吃咸菜吗");
        assert_eq!(messages.len(), 2);

        let prompt = messages[1].text().unwrap();
        assert!(prompt.contains("参考信息:\n块一\n\n块二"));
        assert!(prompt.contains("聊天历史:\n用户: 高血压要注意什么\nAI医疗助手: 少盐\n"));
        assert!(prompt.contains("用户问题: 能吃咸菜吗"));
    }

    #[test]
    fn test_history_context_limited_to_five() {
        let history: Vec<Message> = (0..8).map(|i| Message::user(format!("m{}", i))).collect();
        let rendered = ContextBuilder::render_history_context(&history);

        assert!(!rendered.contains("m2"));
        assert!(rendered.contains("m3"));
        assert!(rendered.contains("m7"));
        assert_eq!(ContextBuilder::render_history_context(&[]), "");
    }

    #[test]
    fn test_multimodal_messages_end_with_image_turn() {
        let builder = ContextBuilder::default();
        let history = vec![Message::user("之前的问题").with_image_url("/uploads/a.png")];

        let messages = builder.build_multimodal_messages(&history, "data:image/png;base64,AA", "看看这个");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, MessageContent::Text("之前的问题".to_string()));
        assert!(matches!(messages[2].content, MessageContent::Parts(_)));
    }
}
