//! HTTP narration provider speaking a messages-style completion API.
use coinpath_game::{BattleFacts, NarrationError, NarrationFacts, Narrator, SpendFacts};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::{env, time::Duration};
use thiserror::Error;

const DEFAULT_MODEL: &str = "narrator-small";
const DEFAULT_MAX_TOKENS: u16 = 60;
const MESSAGES_PATH: &str = "/v1/messages";

/// Narration endpoint settings sourced from the environment.
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u16,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum NarratorConfigError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("client build failure: {0}")]
    ClientBuild(String),
}

impl NarratorConfig {
    /// Read `COINPATH_NARRATOR_URL`, `COINPATH_NARRATOR_KEY` and optional
    /// `COINPATH_NARRATOR_MODEL` / `COINPATH_NARRATOR_MAX_TOKENS`.
    pub fn from_env(timeout: Duration) -> Result<Self, NarratorConfigError> {
        let required = |name: &'static str| {
            env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(NarratorConfigError::Missing(name))
        };
        let base_url = required("COINPATH_NARRATOR_URL")?;
        let api_key = required("COINPATH_NARRATOR_KEY")?;

        let model = env::var("COINPATH_NARRATOR_MODEL")
            .map(|value| value.trim().to_string())
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_tokens = env::var("COINPATH_NARRATOR_MAX_TOKENS")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS);

        Ok(Self {
            api_key,
            base_url,
            model,
            max_tokens,
            timeout,
        })
    }

    #[must_use]
    pub fn messages_url(&self) -> String {
        format!("{}{MESSAGES_PATH}", self.base_url.trim_end_matches('/'))
    }
}

/// Blocking narrator; one request per line with the configured timeout.
pub struct HttpNarrator {
    http: Client,
    config: NarratorConfig,
}

impl HttpNarrator {
    pub fn new(config: NarratorConfig) -> Result<Self, NarratorConfigError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| NarratorConfigError::ClientBuild(err.to_string()))?;
        Ok(Self { http, config })
    }

    fn timeout_millis(&self) -> u64 {
        u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Narrator for HttpNarrator {
    fn narrate(&self, facts: &NarrationFacts) -> Result<String, NarrationError> {
        let payload = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user",
                content: build_prompt(facts),
            }],
        };

        let response = self
            .http
            .post(self.config.messages_url())
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    NarrationError::Timeout {
                        millis: self.timeout_millis(),
                    }
                } else {
                    NarrationError::Provider(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NarrationError::Provider(format!("HTTP {status}")));
        }

        let body: MessagesResponse = response
            .json()
            .map_err(|err| NarrationError::Provider(err.to_string()))?;
        first_text(body).ok_or(NarrationError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u16,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

fn first_text(body: MessagesResponse) -> Option<String> {
    body.content
        .into_iter()
        .find_map(|block| block.text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn build_prompt(facts: &NarrationFacts) -> String {
    match facts {
        NarrationFacts::Battle(battle) => battle_prompt(battle),
        NarrationFacts::Spend(spend) => spend_prompt(spend),
    }
}

fn battle_prompt(facts: &BattleFacts) -> String {
    let crit = if facts.is_crit { "CRITICAL " } else { "" };
    if facts.defeated {
        format!(
            "You are narrating a JRPG battle. The hero (Level {}, {}-day saving streak) just defeated \"{}\" (a financial bad-habit demon) with a {crit}{} damage hit! Write ONE dramatic victory sentence in JRPG style. Keep it under 20 words. No quotes.",
            facts.hero_level, facts.day_streak, facts.demon_name, facts.hero_damage
        )
    } else {
        format!(
            "You are narrating a JRPG battle. Hero (Lv{}) dealt {} {crit}DMG to \"{}\". The demon struck back for {} DMG. Write ONE dramatic battle sentence in JRPG style. Under 20 words. No quotes.",
            facts.hero_level, facts.hero_damage, facts.demon_name, facts.demon_damage
        )
    }
}

fn spend_prompt(facts: &SpendFacts) -> String {
    format!(
        "You are a financial guide inside a JRPG game. The hero wants to spend ${:.2} on {} with ${:.2} safe to spend this month and a ${:.2} savings goal. The verdict is {} ({} tiles, about {} days of delay). Explain the verdict in 1-2 short JRPG-flavored sentences. No quotes.",
        facts.amount,
        facts.category,
        facts.safe_to_spend,
        facts.goal_amount,
        facts.verdict,
        facts.tile_delta,
        facts.days_delta
    )
}
