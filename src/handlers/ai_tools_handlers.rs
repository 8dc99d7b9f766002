use actix_web::{get, HttpResponse, Responder};
use serde::Serialize;

use crate::errors::ApiResponse;

#[derive(Serialize)]
pub struct AiTool {
    pub name: &'static str,
    pub category: &'static str,
    pub url: &'static str,
    pub description: &'static str,
}

pub const AI_TOOLS: &[AiTool] = &[
    AiTool {
        name: "ChatGPT",
        category: "Assistants",
        url: "https://chat.openai.com",
        description: "General-purpose conversational assistant.",
    },
    AiTool {
        name: "Claude",
        category: "Assistants",
        url: "https://claude.ai",
        description: "Conversational assistant for writing, analysis and code.",
    },
    AiTool {
        name: "Gemini",
        category: "Assistants",
        url: "https://gemini.google.com",
        description: "Google's multimodal assistant.",
    },
    AiTool {
        name: "Perplexity",
        category: "Search",
        url: "https://www.perplexity.ai",
        description: "Answer engine that cites its sources.",
    },
    AiTool {
        name: "GitHub Copilot",
        category: "Coding",
        url: "https://github.com/features/copilot",
        description: "Code completion inside the editor.",
    },
    AiTool {
        name: "Midjourney",
        category: "Images",
        url: "https://www.midjourney.com",
        description: "Text-to-image generation.",
    },
    AiTool {
        name: "Stable Diffusion",
        category: "Images",
        url: "https://stability.ai",
        description: "Open image generation models.",
    },
    AiTool {
        name: "DeepL",
        category: "Writing",
        url: "https://www.deepl.com",
        description: "Machine translation.",
    },
    AiTool {
        name: "Grammarly",
        category: "Writing",
        url: "https://www.grammarly.com",
        description: "Grammar and style suggestions.",
    },
    AiTool {
        name: "ElevenLabs",
        category: "Audio",
        url: "https://elevenlabs.io",
        description: "Speech synthesis and voice cloning.",
    },
];

#[derive(Serialize)]
struct AiToolsResponse {
    tools: &'static [AiTool],
    total: usize,
}

/// GET /ai-tools
/// Public, static directory; nothing is read from the store.
#[get("/ai-tools")]
pub async fn ai_tools() -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(
        "AI tools retrieved successfully",
        AiToolsResponse {
            tools: AI_TOOLS,
            total: AI_TOOLS.len(),
        },
    ))
}
