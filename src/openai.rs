use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde_json::json;
use tracing::{info, warn};

const API_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const VISION_MODEL: &str = "gpt-4o";
const ADVISORY_MODEL: &str = "gpt-3.5-turbo-0125";
const MAX_TOKENS: u32 = 800;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

const EXTRACTION_PROMPT: &str =
    "List the ingredients exactly as they appear on the food label in this image. \
     Output only the ingredient list, nothing else.";

const ADVISORY_SYSTEM_PROMPT: &str =
    "You are an assistant knowledgeable about food ingredient sourcing and halal \
     certification practice. Given ingredient names, briefly explain what each one \
     typically is, common sources, and why its halal status can be uncertain. \
     This is background information, not a ruling.";

fn api_key() -> Result<String> {
    std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow!("OPENAI_API_KEY environment variable must be set"))
}

/// Send a label photo to the vision model and get the raw ingredient text
/// back. The caller feeds the result through the normalization pipeline; no
/// cleanup happens here.
pub async fn extract_ingredients_from_image(image: &Path) -> Result<String> {
    let bytes = std::fs::read(image)
        .with_context(|| format!("reading image {}", image.display()))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    info!("Sending {} ({} KiB) to {}", image.display(), bytes.len() / 1024, VISION_MODEL);

    let payload = json!({
        "model": VISION_MODEL,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": EXTRACTION_PROMPT },
                { "type": "image_url", "image_url": {
                    "url": format!("data:image/jpeg;base64,{encoded}")
                }},
            ],
        }],
        "max_tokens": MAX_TOKENS,
        "temperature": 0,
    });

    chat_completion(&payload).await
}

/// Free-text opinion on ingredients the reference table could not identify.
/// Purely advisory; the verdict is computed before this is called and is not
/// affected by the response.
pub async fn advisory_opinion(unknown: &[String]) -> Result<String> {
    let payload = json!({
        "model": ADVISORY_MODEL,
        "messages": [
            { "role": "system", "content": ADVISORY_SYSTEM_PROMPT },
            { "role": "user", "content": format!(
                "These ingredients were not found in the reference dataset: {}",
                unknown.join(", ")
            )},
        ],
        "max_tokens": MAX_TOKENS,
        "temperature": 0,
    });

    chat_completion(&payload).await
}

async fn chat_completion(payload: &serde_json::Value) -> Result<String> {
    let key = api_key()?;
    let client = reqwest::Client::new();

    for attempt in 0..=MAX_RETRIES {
        let response = client
            .post(API_ENDPOINT)
            .bearer_auth(&key)
            .json(payload)
            .send()
            .await?;
        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            if attempt == MAX_RETRIES {
                return Err(anyhow!("OpenAI returned {} after {} retries", status, MAX_RETRIES));
            }
            let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
            warn!(
                "OpenAI returned {} (attempt {}/{}), backing off {:.1}s",
                status,
                attempt + 1,
                MAX_RETRIES,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI request failed ({}): {}", status, body));
        }

        let value: serde_json::Value = response.json().await?;
        let content = value
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow!("No content in OpenAI response"))?;
        return Ok(content.trim().to_string());
    }

    Err(anyhow!("OpenAI request exhausted retries"))
}
