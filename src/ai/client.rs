use crate::config::DesignerConfig;
use crate::error::{DesignerError, Result};
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::{Duration, sleep};

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_retries: u32,
    dump_dir: Option<PathBuf>,
}

impl GeminiClient {
    pub fn from_config(config: &DesignerConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| DesignerError::Config("GEMINI_API_KEY must be set".into()))?;

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(config.http_timeout)
                .build()?,
            api_key,
            model: config.model.clone(),
            max_retries: config.max_retries,
            dump_dir: config.dump_dir.clone(),
        })
    }

    pub async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_schema: Option<Value>,
        stage_name: &str,
    ) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.generate_attempt(system_prompt, user_prompt, response_schema.clone(), stage_name).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.max_retries => {
                    log::warn!("{stage_name} attempt {attempt}/{} failed: {e}", self.max_retries);
                    sleep(Duration::from_secs(2u64.pow(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn generate_attempt(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_schema: Option<Value>,
        stage_name: &str,
    ) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let mut payload = json!({
            "systemInstruction": {
                "parts": [{ "text": system_prompt }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": user_prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json"
            }
        });

        if let Some(schema) = response_schema {
            payload["generationConfig"]["responseSchema"] = schema;
        }

        let res = self.client.post(&url).json(&payload).send().await?;

        if !res.status().is_success() {
            let status = res.status();
            let err_text = res.text().await.unwrap_or_default();
            log::error!("{stage_name} API Error: {err_text}");
            return Err(DesignerError::PortFailure(format!("API Error {status}: {err_text}")));
        }

        let body: Value = res.json().await?;
        let text = clean_json_block(&extract_text(&body)?);
        self.dump_response(stage_name, &text);
        Ok(text)
    }

    fn dump_response(&self, stage_name: &str, text: &str) {
        let Some(dir) = &self.dump_dir else {
            return;
        };

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let safe_stage = stage_name.replace(' ', "_").replace('/', "-");
        let path = dir.join(format!("llm_response_{safe_stage}_{timestamp}.json"));

        if let Err(e) = fs::create_dir_all(dir).and_then(|()| fs::write(&path, text)) {
            log::warn!("Failed to dump response to {}: {e}", path.display());
        } else {
            log::info!("💾 LLM Response dumped to '{}'", path.display());
        }
    }
}

fn extract_text(body: &Value) -> Result<String> {
    if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
        return Err(DesignerError::PortFailure(format!("Prompt blocked: {reason}")));
    }

    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DesignerError::PortFailure("No text content returned".into()))
}

/// Strips a surrounding markdown code fence, if the model added one.
fn clean_json_block(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim().to_string()
}
