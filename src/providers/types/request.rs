use super::message::Message;
use super::tool::Tool;
use crate::providers::configs::SamplingParams;

/// Everything a backend needs for one round trip.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub sampling: &'a SamplingParams,
    pub num_ctx: u32,
    pub tools: &'a [Tool],
    pub stream: bool,
}
