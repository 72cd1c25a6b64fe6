//! JSON shapes of the `generateContent` REST endpoint and parsing of the
//! structured replies carried in its text parts.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use orthographe_core::types::{ErrorSpan, EvaluationResult};

use crate::error::GenerationError;
use crate::service::{CatalogEntry, GeneratedText};

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

impl GenerateContentRequest {
    /// A prompt whose reply must be JSON matching `schema`.
    pub fn structured(prompt: String, schema: Value) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema),
                ..GenerationConfig::default()
            }),
        }
    }

    /// A prompt whose reply must be audio spoken by `voice_name`.
    pub fn speech(prompt: String, voice_name: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice_name.to_string(),
                        },
                    },
                }),
                ..GenerationConfig::default()
            }),
        }
    }
}

// =============================================================================
// Response schemas
// =============================================================================

pub fn catalog_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "author": { "type": "STRING" },
                        "source": { "type": "STRING" },
                        "date": { "type": "STRING" }
                    },
                    "required": ["author", "source", "date"]
                }
            }
        },
        "required": ["items"]
    })
}

pub fn text_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "content": { "type": "STRING" },
            "wordCount": { "type": "NUMBER" }
        },
        "required": ["content", "wordCount"]
    })
}

pub fn evaluation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "NUMBER" },
            "comment": { "type": "STRING" },
            "errors": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "text": { "type": "STRING" },
                        "type": { "type": "STRING" },
                        "hint": { "type": "STRING" },
                        "startIndex": { "type": "NUMBER" },
                        "endIndex": { "type": "NUMBER" }
                    },
                    "required": ["text", "type", "hint", "startIndex", "endIndex"]
                }
            },
            "correctText": { "type": "STRING" }
        },
        "required": ["score", "comment", "errors", "correctText"]
    })
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: Option<String>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Fail if the prompt was blocked.
    pub fn check_blocked(&self) -> Result<(), GenerationError> {
        match self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            Some(reason) => Err(GenerationError::Blocked(reason.to_string())),
            None => Ok(()),
        }
    }

    fn first_parts(&self) -> Result<&[ResponsePart], GenerationError> {
        let candidate = self
            .candidates
            .first()
            .ok_or_else(|| GenerationError::EmptyResponse("no candidates".to_string()))?;
        Ok(candidate
            .content
            .as_ref()
            .map(|c| c.parts.as_slice())
            .unwrap_or_default())
    }

    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Result<String, GenerationError> {
        self.check_blocked()?;
        let text: String = self
            .first_parts()?
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse("no text in reply".to_string()));
        }
        Ok(text)
    }

    /// Base64 payload of the first inline-data part of the first candidate.
    pub fn audio(&self) -> Result<String, GenerationError> {
        self.check_blocked()?;
        self.first_parts()?
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .filter_map(|d| d.data.as_deref())
            .find(|data| !data.is_empty())
            .map(str::to_string)
            .ok_or(GenerationError::MissingAudio)
    }
}

// =============================================================================
// Structured reply parsing
// =============================================================================

/// Strip a Markdown code fence around a JSON reply.
pub fn clean_json_string(raw: &str) -> &str {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogReply {
    Wrapped {
        #[serde(default)]
        items: Vec<CatalogEntry>,
    },
    Bare(Vec<CatalogEntry>),
}

/// Parse a catalog reply, dropping entries without author or source.
pub fn parse_catalog(raw: &str) -> Result<Vec<CatalogEntry>, GenerationError> {
    let reply: CatalogReply = serde_json::from_str(clean_json_string(raw))?;
    let items = match reply {
        CatalogReply::Wrapped { items } => items,
        CatalogReply::Bare(items) => items,
    };
    let before = items.len();
    let items: Vec<CatalogEntry> = items
        .into_iter()
        .map(|e| CatalogEntry::new(e.author.trim(), e.source.trim(), e.date.trim()))
        .filter(|e| !e.author.is_empty() && !e.source.is_empty())
        .collect();
    if items.len() < before {
        tracing::debug!(dropped = before - items.len(), "catalog entries without author or source");
    }
    Ok(items)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextReply {
    #[serde(default)]
    content: String,
    word_count: Option<f64>,
}

/// Parse an excerpt reply; a missing word count is recomputed.
pub fn parse_text(raw: &str) -> Result<GeneratedText, GenerationError> {
    let reply: TextReply = serde_json::from_str(clean_json_string(raw))?;
    let content = reply.content.trim().to_string();
    if content.is_empty() {
        return Err(GenerationError::Incomplete("excerpt has no content".to_string()));
    }
    let word_count = match reply.word_count {
        Some(n) if n.is_finite() && n > 0.0 => n.round() as u32,
        _ => content.split_whitespace().count() as u32,
    };
    Ok(GeneratedText {
        content,
        word_count,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationReply {
    score: Option<f64>,
    #[serde(default)]
    comment: String,
    #[serde(default)]
    correct_text: String,
    #[serde(default)]
    errors: Vec<Value>,
}

/// Parse an evaluation reply.
///
/// A missing score is an error. Error entries missing `text`, `hint` or
/// `type` get empty defaults; entries without usable offsets are dropped.
pub fn parse_evaluation(raw: &str) -> Result<EvaluationResult, GenerationError> {
    let reply: EvaluationReply = serde_json::from_str(clean_json_string(raw))?;
    let score = reply
        .score
        .ok_or_else(|| GenerationError::Incomplete("evaluation has no score".to_string()))?;

    let total = reply.errors.len();
    let errors: Vec<ErrorSpan> = reply
        .errors
        .into_iter()
        .filter_map(|mut value| {
            if let Value::Object(map) = &mut value {
                for field in ["text", "hint", "type"] {
                    map.entry(field).or_insert_with(|| Value::String(String::new()));
                }
            }
            serde_json::from_value(value).ok()
        })
        .collect();
    if errors.len() < total {
        tracing::warn!(dropped = total - errors.len(), "unusable error annotations in evaluation");
    }

    Ok(EvaluationResult {
        score,
        comment: reply.comment,
        correct_text: reply.correct_text,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orthographe_core::types::ErrorKind;

    #[test]
    fn test_structured_request_shape() {
        let req = GenerateContentRequest::structured("p".into(), text_schema());
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "p");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!(v["generationConfig"].get("responseModalities").is_none());
    }

    #[test]
    fn test_speech_request_shape() {
        let req = GenerateContentRequest::speech("Read: x".into(), "Puck");
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            v["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Puck"
        );
        assert!(v["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_clean_json_string() {
        assert_eq!(clean_json_string("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(clean_json_string("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(clean_json_string("```\n[]\n```"), "[]");
    }

    #[test]
    fn test_response_text_and_blocked() {
        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(resp.text().unwrap(), "{\"a\":1}");

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(matches!(blocked.text(), Err(GenerationError::Blocked(r)) if r == "SAFETY"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(empty.text(), Err(GenerationError::EmptyResponse(_))));
    }

    #[test]
    fn test_response_audio() {
        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"ok"},
                {"inlineData":{"mimeType":"audio/L16;rate=24000","data":"AAAA"}}
            ]}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.audio().unwrap(), "AAAA");

        let no_audio: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]}}]}"#)
                .unwrap();
        assert!(matches!(no_audio.audio(), Err(GenerationError::MissingAudio)));

        let no_content: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"OTHER"}]}"#).unwrap();
        assert!(matches!(no_content.audio(), Err(GenerationError::MissingAudio)));
    }

    #[test]
    fn test_parse_catalog() {
        let items = parse_catalog(
            "```json\n{\"items\":[{\"author\":\"Annie ERNAUX\",\"source\":\"La Place\",\"date\":\"1983\"},{\"author\":\"\",\"source\":\"x\",\"date\":\"\"}]}\n```",
        )
        .unwrap();
        assert_eq!(items, vec![CatalogEntry::new("Annie ERNAUX", "La Place", "1983")]);

        assert!(parse_catalog("{}").unwrap().is_empty());
        let bare = parse_catalog(r#"[{"author":"Colette","source":"Sido"}]"#).unwrap();
        assert_eq!(bare[0].date, "");
        assert!(parse_catalog("not json").is_err());
    }

    #[test]
    fn test_parse_text() {
        let text = parse_text(r#"{"content":" Il était une fois. ","wordCount":4.0}"#).unwrap();
        assert_eq!(text.content, "Il était une fois.");
        assert_eq!(text.word_count, 4);

        let recount = parse_text(r#"{"content":"Un deux trois"}"#).unwrap();
        assert_eq!(recount.word_count, 3);

        assert!(matches!(
            parse_text(r#"{"content":"  ","wordCount":0}"#),
            Err(GenerationError::Incomplete(_))
        ));
    }

    #[test]
    fn test_parse_evaluation_lenient() {
        let raw = r#"{
            "score": 7,
            "comment": "Bien.",
            "correctText": "Les enfants jouaient.",
            "errors": [
                {"text":"jouait","type":"grammaire","hint":"Accord","startIndex":12,"endIndex":18},
                {"type":"orthographe","startIndex":4.0,"endIndex":"x"},
                {"startIndex":0,"endIndex":3}
            ]
        }"#;
        let result = parse_evaluation(raw).unwrap();
        assert_eq!(result.score, 7.0);
        assert_eq!(result.correct_text, "Les enfants jouaient.");
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].kind, ErrorKind::Grammar);
        assert_eq!(result.errors[1].kind, ErrorKind::Lexical);
        assert_eq!(result.errors[1].hint, "");
    }

    #[test]
    fn test_parse_evaluation_requires_score() {
        assert!(matches!(
            parse_evaluation(r#"{"comment":"?"}"#),
            Err(GenerationError::Incomplete(_))
        ));
    }
}
