use async_trait::async_trait;
use std::sync::Arc;

use super::llm::LlmClient;
use super::{Coach, parse_reply, prompts};
use crate::error::Result;
use crate::models::{CoachMessage, StudentProfile};

pub struct LlmCoach {
    llm: Arc<dyn LlmClient>,
}

impl LlmCoach {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Coach for LlmCoach {
    async fn coach(&self, profile: &StudentProfile) -> Result<CoachMessage> {
        let reply = self.llm.complete(&prompts::coach_prompt(profile)).await?;
        parse_reply(&reply)
    }
}
