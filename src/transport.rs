//! Language-model transport
//!
//! The orchestrator only sees [`Transport`]. The concrete client talks to an
//! OpenAI-compatible `/chat/completions` endpoint over blocking HTTP.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::agent::Role;
use crate::config::{Config, ModelConfig};

/// Something that can put a prompt to an agent and return its raw reply
pub trait Transport {
    fn call_agent(&self, role: Role, prompt: &str) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn call_agent(&self, role: Role, prompt: &str) -> Result<String> {
        (**self).call_agent(role, prompt)
    }
}

/// Chat completions request structures
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat completions response structures
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Blocking client for an OpenAI-compatible chat endpoint
pub struct ChatCompletionsTransport {
    agent: ureq::Agent,
    url: String,
    model: String,
    api_key: String,
}

impl ChatCompletionsTransport {
    pub fn new(endpoint: &str, model: &str, api_key: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder().timeout_global(Some(timeout)).build();

        Self {
            agent: config.into(),
            url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Build from config, resolving the API key
    pub fn from_config(model: &ModelConfig) -> Result<Self> {
        let api_key = get_api_key(&model.api_key_env)?;
        Ok(Self::new(
            &model.endpoint,
            &model.model,
            &api_key,
            Duration::from_secs(model.timeout_secs),
        ))
    }

    fn system_message(role: Role) -> String {
        format!("You are the {} agent.", role)
    }
}

impl Transport for ChatCompletionsTransport {
    fn call_agent(&self, role: Role, prompt: &str) -> Result<String> {
        log::debug!("Calling {} via {} ({} prompt chars)", role, self.url, prompt.len());

        let system = Self::system_message(role);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let request_body = serde_json::to_string(&request).context("Failed to serialize request")?;

        let mut response = self
            .agent
            .post(&self.url)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(request_body.as_bytes())
            .context("Failed to call chat completions API")?;

        let response_body = response
            .body_mut()
            .read_to_string()
            .context("Failed to read response")?;

        extract_content(&response_body)
    }
}

/// Pull the first choice's text out of a chat completions response body
fn extract_content(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body).context("Failed to parse chat completions response")?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| eyre::eyre!("No message content in chat completions response"))
}

/// Look up the API key: environment first, then `<startsim dir>/.env`
fn get_api_key(env_var: &str) -> Result<String> {
    if let Ok(key) = std::env::var(env_var)
        && !key.trim().is_empty()
    {
        return Ok(key);
    }

    let env_file = Config::startsim_dir().join(".env");
    if env_file.exists() {
        let content = fs::read_to_string(&env_file).context("Failed to read .env file")?;
        if let Some(value) = find_env_value(&content, env_var) {
            return Ok(value);
        }
    }

    eyre::bail!(
        "Missing API key: {} not found in environment or {}",
        env_var,
        env_file.display()
    )
}

fn find_env_value(content: &str, env_var: &str) -> Option<String> {
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once('=')
            && key.trim() == env_var
        {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            return Some(value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"{\"decision\":\"go\"}"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), r#"{"decision":"go"}"#);
    }

    #[test]
    fn test_extract_content_without_choices() {
        assert!(extract_content(r#"{"choices":[]}"#).is_err());
        assert!(extract_content(r#"{"choices":[{"message":{"content":null}}]}"#).is_err());
        assert!(extract_content("<html>502</html>").is_err());
    }

    #[test]
    fn test_find_env_value() {
        let content = "# keys\nOTHER=1\nGITHUB_TOKEN = \"abc123\"\n";
        assert_eq!(find_env_value(content, "GITHUB_TOKEN"), Some("abc123".to_string()));
        assert_eq!(find_env_value(content, "MISSING"), None);
    }

    #[test]
    fn test_url_joins_endpoint() {
        let transport = ChatCompletionsTransport::new("http://localhost:9/v1/", "m", "k", Duration::from_secs(1));
        assert_eq!(transport.url, "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn test_unreachable_endpoint_is_an_error() {
        let transport = ChatCompletionsTransport::new("http://127.0.0.1:9", "m", "k", Duration::from_secs(2));
        assert!(transport.call_agent(Role::Ceo, "hello").is_err());
    }

    #[test]
    fn test_system_message() {
        assert_eq!(ChatCompletionsTransport::system_message(Role::Designer), "You are the Designer agent.");
    }
}
