//! Chat-completion client with parallel per-round fan-out.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;

use crate::config::GameConfig;
use crate::error::LlmError;
use crate::game::{Game, Move, PlayerId};
use crate::llm::memory::{MEMORY_WORD_LIMIT, MemoryStore, truncate_words};
use crate::llm::provider::{OPENAI, Provider};
use crate::prompt::{self, DEFAULT_SYSTEM_PROMPT};

/// Sampling temperature for tactical requests.
const TEMPERATURE: f64 = 0.7;

/// Token cap per completion; moves and notes are short.
const MAX_TOKENS: u32 = 200;

/// HTTP client for move and memory requests.
///
/// Cloning shares the connection pool and the memory store.
#[derive(Debug, Clone)]
pub struct LlmClient {
    api_key: String,
    provider: &'static Provider,
    http: reqwest::Client,
    system_prompt: String,
    memory: MemoryStore,
}

impl LlmClient {
    /// Create a client, detecting the provider from the key prefix.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingKey`] for an empty key, or an HTTP error
    /// when the underlying client cannot be built.
    pub fn new(api_key: &str, config: &GameConfig) -> Result<Self, LlmError> {
        if api_key.is_empty() {
            return Err(LlmError::MissingKey);
        }
        let provider = Provider::detect(api_key, &OPENAI);
        log::info!("llm provider: {}", provider.name);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            api_key: api_key.to_string(),
            provider,
            http,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            memory: MemoryStore::new(),
        })
    }

    /// Override the system prompt.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// The shared memory store (cleared by the engine on reset).
    #[must_use]
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// The detected provider.
    #[must_use]
    pub fn provider(&self) -> &'static Provider {
        self.provider
    }

    /// Request one player's tactical move.
    ///
    /// # Errors
    ///
    /// Any transport, status, parse, or validation failure is an error;
    /// the engine substitutes a random-safe move in that case.
    pub async fn player_move(&self, game: &Game, id: PlayerId) -> Result<Move, LlmError> {
        let memory = self.memory.get(id);
        let artifacts = prompt::build_prompt(game, id, &self.system_prompt, &memory);
        let body = self.request_body(
            self.provider.tactical_model,
            &artifacts.system,
            &artifacts.user,
            Some(&artifacts.schema),
        );
        let content = self.chat(&body).await?;
        let mv = parse_move(&content)?;
        if !game.validate_move(id, &mv) {
            return Err(LlmError::Schema(format!(
                "move rejected for player {id}"
            )));
        }
        Ok(mv)
    }

    /// Request the given players' moves in parallel.
    ///
    /// One failing request never fails the batch; each player gets their
    /// own `Result`.
    pub async fn all_player_moves(
        &self,
        game: &Game,
        players: &[PlayerId],
    ) -> BTreeMap<PlayerId, Result<Move, LlmError>> {
        let requests = players
            .iter()
            .map(|&id| async move { (id, self.player_move(game, id).await) });
        join_all(requests).await.into_iter().collect()
    }

    /// Fire-and-forget memory update after a successful move.
    ///
    /// Failures are logged and swallowed; a lost note never regresses the
    /// game.
    pub fn spawn_memory_update(&self, game: &Game, id: PlayerId, last_move: &Move) {
        let previous = self.memory.get(id);
        let user = prompt::build_memory_prompt(game, id, last_move, &previous);
        if user.is_empty() {
            return;
        }
        let body = self.request_body(
            self.provider.memory_model,
            "You keep short tactical notes for a bomb-placement game agent.",
            &user,
            None,
        );
        let client = self.clone();
        tokio::spawn(async move {
            match client.chat(&body).await {
                Ok(notes) => {
                    client
                        .memory
                        .set(id, &truncate_words(&notes, MEMORY_WORD_LIMIT));
                }
                Err(err) => log::debug!("memory update for player {id} failed: {err}"),
            }
        });
    }

    /// Assemble a chat-completion request body.
    fn request_body(
        &self,
        model: &str,
        system: &str,
        user: &str,
        schema: Option<&Value>,
    ) -> Value {
        let response_format = match schema {
            Some(schema) if self.provider.supports_schema => serde_json::json!({
                "type": "json_schema",
                "json_schema": schema,
            }),
            Some(_) => serde_json::json!({ "type": "json_object" }),
            None => Value::Null,
        };
        let mut body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });
        if !response_format.is_null()
            && let Some(map) = body.as_object_mut()
        {
            map.insert("response_format".to_string(), response_format);
        }
        body
    }

    /// Post one request and return the first choice's content.
    async fn chat(&self, body: &Value) -> Result<String, LlmError> {
        let response = self
            .http
            .post(self.provider.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }
        let payload: Value = response.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::Parse("no message content in response".to_string()))
    }
}

impl crate::engine::MoveProvider for LlmClient {
    async fn round_moves(
        &mut self,
        game: &Game,
        players: &[PlayerId],
    ) -> BTreeMap<PlayerId, Result<Move, LlmError>> {
        let results = self.all_player_moves(game, players).await;
        // Memory updates ride on successful moves; failures get no notes
        for (id, result) in &results {
            if let Ok(mv) = result {
                self.spawn_memory_update(game, *id, mv);
            }
        }
        results
    }

    fn reset(&mut self) {
        self.memory.clear();
    }
}

/// Parse a completion's content as a move.
///
/// # Errors
///
/// Returns [`LlmError::Parse`] when the content is not the expected JSON
/// object.
pub fn parse_move(content: &str) -> Result<Move, LlmError> {
    serde_json::from_str(content.trim()).map_err(|e| LlmError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Direction;
    use crate::prompt::PromptArtifacts;

    fn client(key: &str) -> LlmClient {
        LlmClient::new(key, &GameConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = LlmClient::new("", &GameConfig::default()).unwrap_err();
        assert!(matches!(err, LlmError::MissingKey));
    }

    #[test]
    fn test_provider_detection() {
        assert_eq!(client("gsk_test").provider().name, "groq");
        assert_eq!(client("sk-test").provider().name, "openai");
        assert_eq!(client("mystery").provider().name, "openai");
    }

    #[test]
    fn test_request_body_uses_strict_schema_when_supported() {
        let c = client("sk-test");
        let schema = PromptArtifacts::move_schema();
        let body = c.request_body("gpt-4o-mini", "sys", "user", Some(&schema));
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["temperature"], TEMPERATURE);
        assert_eq!(body["max_tokens"], MAX_TOKENS);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
    }

    #[test]
    fn test_request_body_falls_back_to_json_object() {
        let c = client("gsk_test");
        let schema = PromptArtifacts::move_schema();
        let body = c.request_body("llama-3.3-70b-versatile", "sys", "user", Some(&schema));
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_request_body_omits_format_without_schema() {
        let c = client("sk-test");
        let body = c.request_body("gpt-4o-mini", "sys", "user", None);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_parse_move() {
        let mv = parse_move(r#"{"direction":"up","dropBomb":true,"thought":"push"}"#).unwrap();
        assert_eq!(mv.direction, Direction::Up);
        assert!(mv.drop_bomb);

        assert!(parse_move("not json").is_err());
        assert!(parse_move(r#"{"direction":"diagonal","dropBomb":false}"#).is_err());
    }
}
