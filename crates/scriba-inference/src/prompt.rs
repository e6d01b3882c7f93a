//! Shared prompt construction and context budgeting.
//!
//! Every provider adapter builds its instructions and truncates document
//! content through this module, so the budgeting rules live in exactly one
//! place: tokens are estimated at roughly four characters each, a fixed
//! allowance is reserved for the response, and content that exceeds the
//! remaining budget keeps a 40% prefix / 60% suffix split, trimmed back to
//! the last complete sentence.

use scriba_core::defaults::{CHARS_PER_TOKEN, TRUNCATE_PREFIX_SHARE};
use scriba_core::PromptConfig;

/// Built-in analysis instructions, used when no `SYSTEM_PROMPT` override is
/// configured.
pub const DEFAULT_ANALYSIS_PROMPT: &str = "\
You are a document analyzer. Your task is to analyze documents and extract \
relevant information: a short meaningful title, the correspondent (the \
sender, not the receiver), one to four tags, the document type, the document \
date, and the language. Use only the information given in the document. Do \
not ask for additional information or clarification.";

/// Strict output-shape directive appended to every prompt.
pub const OUTPUT_SHAPE_DIRECTIVE: &str = r#"Return the result EXCLUSIVELY as a JSON object. The tags, title and document_type MUST be in the language that is used in the document.:
{
  "title": "xxxxx",
  "correspondent": "xxxxxxxx",
  "tags": ["Tag1", "Tag2", "Tag3", "Tag4"],
  "document_type": "Invoice/Contract/...",
  "document_date": "YYYY-MM-DD",
  "language": "en/de/es/..."
}"#;

/// Build the instruction prompt for one analysis call.
///
/// In fixed-vocabulary mode the model is constrained to the configured tag
/// list instead of inventing tags; otherwise the configured (or default)
/// analysis prompt is used, optionally followed by the store's existing
/// taxonomy so the model prefers reusing known names.
pub fn build_instructions(
    config: &PromptConfig,
    existing_tags: &[String],
    existing_correspondents: &[String],
) -> String {
    let mut instructions = if config.use_prompt_tags {
        format!(
            "You are a document analysis AI. You will analyze the document and \
associate tags with it, find the correspondent of the document (sender, not \
receiver), and find a meaningful short title.\n\
You are given a list of tags: {}\n\
Only use tags from that list and pick the best fitting ones.\n\n{}",
            config.prompt_tags.join(", "),
            OUTPUT_SHAPE_DIRECTIVE
        )
    } else {
        format!(
            "{}\n\n{}",
            config
                .system_prompt
                .as_deref()
                .unwrap_or(DEFAULT_ANALYSIS_PROMPT),
            OUTPUT_SHAPE_DIRECTIVE
        )
    };

    if config.use_existing_data && !config.use_prompt_tags {
        if !existing_tags.is_empty() {
            instructions.push_str("\nExisting tags: ");
            instructions.push_str(&existing_tags.join(", "));
        }
        if !existing_correspondents.is_empty() {
            instructions.push_str("\nExisting correspondents: ");
            instructions.push_str(&existing_correspondents.join(", "));
        }
    }

    instructions
}

/// Rough token count: about four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Context-window budget for one provider call.
#[derive(Debug, Clone, Copy)]
pub struct ContextBudget {
    /// Model context window in tokens.
    pub max_context_tokens: usize,
    /// Tokens reserved for the expected response.
    pub response_reserve_tokens: usize,
}

impl ContextBudget {
    /// Tokens left for document content once instructions and the response
    /// allowance are accounted for.
    pub fn available_for(&self, instructions: &str) -> usize {
        self.max_context_tokens
            .saturating_sub(self.response_reserve_tokens)
            .saturating_sub(estimate_tokens(instructions))
    }
}

/// Dynamic context size for providers that take an explicit window: the
/// estimated prompt plus the expected response, capped at the model limit.
pub fn dynamic_context_size(prompt_tokens: usize, expected_response_tokens: usize, max_ctx: usize) -> usize {
    (prompt_tokens + expected_response_tokens).min(max_ctx)
}

/// Truncate `content` to fit `max_tokens`, keeping a prefix share from the
/// beginning and the remainder from the end, then trimming to the last
/// complete sentence. Returns the kept text and whether truncation happened.
pub fn fit_to_budget(content: &str, max_tokens: usize) -> (String, bool) {
    if estimate_tokens(content) <= max_tokens {
        return (content.to_string(), false);
    }

    let chars: Vec<char> = content.chars().collect();
    let keep_chars = (max_tokens * CHARS_PER_TOKEN).min(chars.len());
    let prefix_chars = (keep_chars as f64 * TRUNCATE_PREFIX_SHARE) as usize;
    let suffix_chars = keep_chars - prefix_chars;

    let mut kept: String = chars[..prefix_chars].iter().collect();
    kept.extend(&chars[chars.len() - suffix_chars..]);

    if let Some(end) = last_sentence_boundary(&kept) {
        kept.truncate(end + 1);
    }

    (kept, true)
}

/// Byte index of the last sentence-final punctuation followed by a space,
/// if any.
fn last_sentence_boundary(text: &str) -> Option<usize> {
    [". ", "? ", "! "]
        .iter()
        .filter_map(|pat| text.rfind(pat))
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt_config() -> PromptConfig {
        PromptConfig {
            system_prompt: None,
            use_existing_data: true,
            use_prompt_tags: false,
            prompt_tags: vec![],
        }
    }

    #[test]
    fn test_instructions_contain_output_directive() {
        let instructions = build_instructions(&prompt_config(), &[], &[]);
        assert!(instructions.contains("EXCLUSIVELY as a JSON object"));
        assert!(instructions.contains("\"document_date\": \"YYYY-MM-DD\""));
    }

    #[test]
    fn test_instructions_list_existing_taxonomy() {
        let tags = vec!["Invoice".to_string(), "Receipt".to_string()];
        let correspondents = vec!["ACME Corp".to_string()];
        let instructions = build_instructions(&prompt_config(), &tags, &correspondents);
        assert!(instructions.contains("Existing tags: Invoice, Receipt"));
        assert!(instructions.contains("Existing correspondents: ACME Corp"));
    }

    #[test]
    fn test_instructions_omit_taxonomy_when_disabled() {
        let mut config = prompt_config();
        config.use_existing_data = false;
        let tags = vec!["Invoice".to_string()];
        let instructions = build_instructions(&config, &tags, &[]);
        assert!(!instructions.contains("Existing tags"));
    }

    #[test]
    fn test_instructions_fixed_vocabulary_mode() {
        let config = PromptConfig {
            system_prompt: None,
            use_existing_data: true,
            use_prompt_tags: true,
            prompt_tags: vec!["Legal".to_string(), "Finance".to_string()],
        };
        let instructions = build_instructions(&config, &["Other".to_string()], &[]);
        assert!(instructions.contains("a list of tags: Legal, Finance"));
        // Fixed vocabulary replaces the existing-taxonomy listing.
        assert!(!instructions.contains("Existing tags"));
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_budget_accounts_for_instructions_and_reserve() {
        let budget = ContextBudget {
            max_context_tokens: 1000,
            response_reserve_tokens: 100,
        };
        // 400 chars of instructions = 100 tokens.
        let instructions = "x".repeat(400);
        assert_eq!(budget.available_for(&instructions), 800);
    }

    #[test]
    fn test_fit_to_budget_untouched_when_small() {
        let (kept, truncated) = fit_to_budget("short document", 100);
        assert_eq!(kept, "short document");
        assert!(!truncated);
    }

    #[test]
    fn test_fit_to_budget_keeps_prefix_and_suffix() {
        // 1000 chars, budget of 100 tokens = 400 chars: 160 from the front,
        // 240 from the back.
        let head = "A".repeat(500);
        let tail = "Z".repeat(500);
        let content = format!("{head}{tail}");
        let (kept, truncated) = fit_to_budget(&content, 100);
        assert!(truncated);
        assert_eq!(kept.chars().count(), 400);
        assert!(kept.starts_with(&"A".repeat(160)));
        assert!(kept.ends_with(&"Z".repeat(240)));
    }

    #[test]
    fn test_fit_to_budget_trims_to_sentence() {
        let head = "First sentence. ".repeat(40); // 640 chars
        let tail = "Closing words. And a dangling fragment without an end";
        let content = format!("{}{}{}", head, "x".repeat(2000), tail);
        let (kept, truncated) = fit_to_budget(&content, 200);
        assert!(truncated);
        assert!(kept.ends_with('.'), "kept text should end at a sentence: {:?}", kept);
    }

    #[test]
    fn test_dynamic_context_size_caps_at_max() {
        assert_eq!(dynamic_context_size(1000, 500, 128_000), 1500);
        assert_eq!(dynamic_context_size(200_000, 1024, 128_000), 128_000);
    }
}
