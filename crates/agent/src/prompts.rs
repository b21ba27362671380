//! Prompt assembly.
//!
//! Four named templates cover every model call the orchestrator makes:
//! standard grounded QA, drawing-only analysis, compliance with an
//! adjusted design, and the agentic system prompt. Retrieved context
//! is capped by a token budget — chunks are dropped from the tail
//! (lowest relevance first) and the question is never truncated.

use lintel_core::chunk::RetrievedChunk;
use lintel_core::drawing::Drawing;
use lintel_core::message::{Message, Role};
use lintel_core::provider::ToolDefinition;
use lintel_geometry as geometry;
use tracing::debug;

/// Cap on the raw-JSON drawing preview embedded in prompts.
const DRAWING_PREVIEW_CHARS: usize = 2_000;

/// How many prior exchanges (user + assistant pairs) to carry.
const HISTORY_EXCHANGES: usize = 3;

const STANDARD_SYSTEM: &str =
    "You are an expert on building regulations. Answer only from the provided context. \
     Be concise and accurate.";

const DRAWING_SYSTEM: &str =
    "You are a helpful assistant that analyzes building drawings and answers questions \
     about them. Be precise and factual.";

/// Everything a prompt may need about the current request.
pub struct PromptInput<'a> {
    pub question: &'a str,
    pub chunks: &'a [RetrievedChunk],
    pub drawing: Option<&'a Drawing>,
    pub drawing_updated_at: Option<&'a str>,
    /// Prior user/assistant turns, oldest first.
    pub history: &'a [Message],
}

pub struct PromptAssembler {
    context_token_budget: usize,
}

impl PromptAssembler {
    pub fn new(context_token_budget: usize) -> Self {
        Self { context_token_budget }
    }

    /// STANDARD_QA: grounded answer with source selection marker.
    pub fn standard_qa(&self, input: &PromptInput, compliance_boost: bool) -> Vec<Message> {
        let kept = self.chunks_within_budget(input.chunks);
        let contexts = render_contexts(&kept);

        let mut prompt = String::from(
            "Based on the following contexts from building regulations, answer the \
             user's question.\n\n\
             IMPORTANT: If none of the contexts contain information to answer the \
             question, respond with \"I cannot answer this question based on the \
             provided context.\"\n\n",
        );

        if compliance_boost && input.drawing.is_some() {
            prompt.push_str(
                "This is a COMPLIANCE question about the user's own building. \
                 Synthesize from the available contexts even if coverage is partial: \
                 list every rule or limit any context mentions, then compare the \
                 building specifications against those rules.\n\n",
            );
        }

        prompt.push_str(&contexts);

        if let Some(drawing) = input.drawing {
            prompt.push_str("\n\nUser's Building Drawing:\n");
            prompt.push_str(&drawing_digest(drawing));
        }

        prompt.push_str(&format!("\n\nQuestion: {}\n", input.question));

        prompt.push_str(&format!(
            "\nInstructions:\n\
             - First, identify the best context number (1-{count}) that answers the question\n\
             - Start your answer with \"[Using Context X]\", then answer based on that context\n",
            count = kept.len().max(1)
        ));
        if input.drawing.is_some() {
            prompt.push_str(
                "- Reference specific values from the building drawing where relevant\n\
                 - If the regulations mention limits, compare them to the drawing's measurements\n",
            );
        }
        push_timestamp_instruction(&mut prompt, input.drawing_updated_at);
        prompt.push_str("\nAnswer:");

        self.with_history(Message::system(STANDARD_SYSTEM), input.history, prompt)
    }

    /// DRAWING_ONLY: describe/analyze the drawing literally, no corpus.
    pub fn drawing_only(&self, input: &PromptInput) -> Vec<Message> {
        let digest = match input.drawing {
            Some(d) => drawing_digest(d),
            None => "The drawing contains no geometry.".to_string(),
        };
        let preview = input
            .drawing
            .map(|d| drawing_preview(d))
            .unwrap_or_else(|| "[]".into());

        let mut prompt = format!(
            "You are analyzing a building drawing. Answer the user's question based \
             ONLY on the drawing data provided below.\n\n\
             User's Building Drawing:\n{digest}\n\n\
             Raw Drawing Data (JSON):\n{preview}\n\n\
             Question: {question}\n\n\
             Instructions:\n\
             - Answer based ONLY on the drawing data provided\n\
             - Be specific and cite exact values from the drawing\n\
             - If the drawing data doesn't contain the information needed, say so clearly\n\
             - Do NOT make assumptions or reference external regulations\n",
            question = input.question,
        );
        push_timestamp_instruction(&mut prompt, input.drawing_updated_at);
        prompt.push_str("\nAnswer:");

        self.with_history(Message::system(DRAWING_SYSTEM), input.history, prompt)
    }

    /// COMPLIANCE_WITH_ADJUSTMENT: verdict plus an adjusted drawing in
    /// the same schema.
    pub fn compliance_with_adjustment(&self, input: &PromptInput) -> Vec<Message> {
        let kept = self.chunks_within_budget(input.chunks);
        let contexts = render_contexts(&kept);
        let digest = input.drawing.map(drawing_digest).unwrap_or_default();
        let preview = input
            .drawing
            .map(|d| drawing_preview(d))
            .unwrap_or_else(|| "[]".into());

        let mut prompt = format!(
            "Analyze the user's building drawing against the regulations and provide \
             an adjusted, compliant version if needed.\n\n\
             REGULATIONS CONTEXT:\n{contexts}\n\n\
             USER'S BUILDING DRAWING:\n{digest}\n\n\
             RAW DRAWING DATA (JSON):\n{preview}\n\n\
             QUESTION: {question}\n\n\
             INSTRUCTIONS:\n\
             1. Analyze whether the current drawing is compliant with the regulations\n\
             2. Identify ALL specific violations\n\
             3. If non-compliant, provide an adjusted JSON in the same schema that \
             meets ALL requirements\n\
             4. Explain what changes were made and why\n\n\
             RESPONSE FORMAT:\n\
             **COMPLIANCE ANALYSIS:** ...\n\
             **VIOLATIONS FOUND:** ...\n\
             **ADJUSTED COMPLIANT JSON:**\n```json\n[...]\n```\n\
             **CHANGES MADE:** ...\n\
             **VERIFICATION:** ...\n",
            question = input.question,
        );
        push_timestamp_instruction(&mut prompt, input.drawing_updated_at);
        prompt.push_str("\nAnswer:");

        self.with_history(Message::system(STANDARD_SYSTEM), input.history, prompt)
    }

    /// AGENTIC_SYSTEM: role, tool roster, termination rule.
    pub fn agentic_system(&self, tools: &[ToolDefinition]) -> String {
        let mut roster = String::new();
        for tool in tools {
            let first_line = tool.description.split('.').next().unwrap_or_default();
            roster.push_str(&format!("- {}: {}\n", tool.name, first_line.trim()));
        }

        format!(
            "You are an expert building regulations AI agent with access to tools.\n\n\
             Your tools:\n{roster}\n\
             Your workflow:\n\
             1. Understand the user's question\n\
             2. Decide which tools you need and call them in the right order\n\
             3. Synthesize the tool results into a clear answer\n\n\
             Guidelines:\n\
             - Always retrieve regulations first if the question involves compliance\n\
             - Calculate dimensions when needed for analysis\n\
             - If asked to fix or adjust a design, use generate_compliant_design\n\
             - Verify your solutions with verify_compliance\n\
             - Be thorough but efficient; don't call unnecessary tools\n\n\
             Stop calling tools and respond in prose when you have a verified answer."
        )
    }

    /// The user turn seeding the agentic conversation.
    pub fn agentic_user(
        &self,
        question: &str,
        drawing: Option<&Drawing>,
        drawing_updated_at: Option<&str>,
    ) -> String {
        let mut parts = vec![format!("User Question: {question}")];

        if let Some(drawing) = drawing {
            let note = drawing_updated_at
                .map(|ts| format!(" (Last updated: {ts})"))
                .unwrap_or_default();
            parts.push(format!("\nBuilding Drawing Available{note}: Yes"));
            parts.push(format!("Drawing Preview: {}", drawing_preview(drawing)));
        }

        parts.join("\n")
    }

    /// Keep the highest-relevance chunks that fit the token budget.
    /// Chunks arrive ordered by decreasing relevance, so dropping from
    /// the tail drops the weakest first.
    fn chunks_within_budget<'c>(&self, chunks: &'c [RetrievedChunk]) -> Vec<&'c RetrievedChunk> {
        let mut kept = Vec::new();
        let mut tokens = 0usize;
        for chunk in chunks {
            let cost = chunk.content.len() / 4;
            if !kept.is_empty() && tokens + cost > self.context_token_budget {
                break;
            }
            tokens += cost;
            kept.push(chunk);
        }
        if kept.len() < chunks.len() {
            debug!(
                kept = kept.len(),
                dropped = chunks.len() - kept.len(),
                "context budget trimmed retrieved chunks"
            );
        }
        kept
    }

    /// system + last-N history exchanges + the assembled user prompt.
    fn with_history(
        &self,
        system: Message,
        history: &[Message],
        user_prompt: String,
    ) -> Vec<Message> {
        let mut messages = vec![system];
        messages.extend(recent_exchanges(history, HISTORY_EXCHANGES));
        messages.push(Message::user(user_prompt));
        messages
    }
}

/// The last `n` user/assistant exchanges from prior turns.
fn recent_exchanges(history: &[Message], n: usize) -> Vec<Message> {
    let relevant: Vec<&Message> = history
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        .collect();
    let take = (n * 2).min(relevant.len());
    relevant[relevant.len() - take..]
        .iter()
        .map(|m| (*m).clone())
        .collect()
}

fn render_contexts(chunks: &[&RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return "(no context available)".into();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[Context {}] ({})\n{}\n", i + 1, c.source_marker(), c.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_timestamp_instruction(prompt: &mut String, drawing_updated_at: Option<&str>) {
    if let Some(ts) = drawing_updated_at {
        prompt.push_str(&format!(
            "- Mention that the drawing is from {ts} so the user knows which version \
             was analyzed\n"
        ));
    }
}

/// Human-readable digest of a drawing for prompts: element count,
/// layer census, plot measurements, highway note.
pub fn drawing_digest(drawing: &Drawing) -> String {
    if drawing.is_empty() {
        return "The drawing contains no geometry.".into();
    }

    let mut lines = vec![format!("- Drawing contains {} elements", drawing.len())];

    let mut layers: Vec<(String, usize)> = Vec::new();
    for object in &drawing.objects {
        let name = if object.layer.is_empty() {
            "(no layer)".to_string()
        } else {
            object.layer.clone()
        };
        match layers.iter_mut().find(|(l, _)| *l == name) {
            Some((_, count)) => *count += 1,
            None => layers.push((name, 1)),
        }
    }
    lines.push("- Layers present:".into());
    for (layer, count) in &layers {
        lines.push(format!("  * {layer}: {count} element(s)"));
    }

    let dims = geometry::all_dimensions(drawing);
    if let (Some(w), Some(h)) = (dims["plot_width_m"].as_f64(), dims["plot_height_m"].as_f64()) {
        lines.push(format!("- Plot Dimensions: {w}m x {h}m"));
    }
    if let Some(area) = dims["plot_area_m2"].as_f64() {
        lines.push(format!("- Plot Area: {area}m²"));
    }
    if let Some(depth) = dims["extension_depth_m"].as_f64() {
        lines.push(format!("- Extension Depth: {depth}m"));
    }
    if let Some(height) = dims["building_height_m"].as_f64() {
        lines.push(format!("- Building Height: {height}m"));
    }

    if drawing.has_layer("Highway") {
        lines.push("- Building is near a highway".into());
    }

    lines.join("\n")
}

/// Raw-JSON preview capped to a fixed length.
fn drawing_preview(drawing: &Drawing) -> String {
    let mut json = serde_json::to_string(drawing).unwrap_or_else(|_| "[]".into());
    if json.len() > DRAWING_PREVIEW_CHARS {
        json.truncate(DRAWING_PREVIEW_CHARS);
        json.push_str("...");
    }
    json
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintel_core::chunk::ContentType;

    fn chunk(content: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            document: "regs.pdf".into(),
            page: 3,
            paragraph: None,
            title: Some("Extensions".into()),
            content: content.into(),
            content_type: ContentType::Text,
            score,
            selected: false,
        }
    }

    fn sample_drawing() -> Drawing {
        serde_json::from_str(
            r#"[
                {"type": "POLYLINE", "layer": "Plot Boundary",
                 "points": [[0, 0], [20000, 0], [20000, 20000], [0, 20000]], "closed": true},
                {"type": "POLYLINE", "layer": "Walls",
                 "points": [[0, 0], [10000, 0], [10000, 8000], [0, 8000]], "closed": true},
                {"type": "LINE", "layer": "Highway", "points": [[0, -5000], [20000, -5000]]}
            ]"#,
        )
        .unwrap()
    }

    fn assembler() -> PromptAssembler {
        PromptAssembler::new(12_000)
    }

    #[test]
    fn standard_qa_numbers_contexts_and_keeps_question() {
        let chunks = vec![chunk("Depth limit is 6 m.", 0.9), chunk("Height limit is 4 m.", 0.8)];
        let input = PromptInput {
            question: "What are the extension depth limits?",
            chunks: &chunks,
            drawing: None,
            drawing_updated_at: None,
            history: &[],
        };
        let messages = assembler().standard_qa(&input, false);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        let user = &messages[1].content;
        assert!(user.contains("[Context 1] (regs.pdf p.3 §Extensions)"));
        assert!(user.contains("[Context 2]"));
        assert!(user.contains("What are the extension depth limits?"));
        assert!(user.contains("[Using Context X]"));
    }

    #[test]
    fn budget_drops_lowest_relevance_tail() {
        // Each chunk is ~250 tokens; budget of 500 keeps two.
        let chunks: Vec<RetrievedChunk> = (0..5)
            .map(|i| chunk(&"x".repeat(1000), 0.9 - i as f32 * 0.05))
            .collect();
        let small = PromptAssembler::new(500);
        let input = PromptInput {
            question: "q",
            chunks: &chunks,
            drawing: None,
            drawing_updated_at: None,
            history: &[],
        };
        let messages = small.standard_qa(&input, false);
        let user = &messages[1].content;
        assert!(user.contains("[Context 2]"));
        assert!(!user.contains("[Context 3]"));
        // The question survives trimming.
        assert!(user.contains("Question: q"));
    }

    #[test]
    fn oversized_first_chunk_is_still_kept() {
        let chunks = vec![chunk(&"x".repeat(100_000), 0.9)];
        let small = PromptAssembler::new(500);
        assert_eq!(small.chunks_within_budget(&chunks).len(), 1);
    }

    #[test]
    fn drawing_digest_mentions_layers_and_measurements() {
        let digest = drawing_digest(&sample_drawing());
        assert!(digest.contains("3 elements"));
        assert!(digest.contains("Plot Boundary: 1 element(s)"));
        assert!(digest.contains("Plot Area: 400m²"));
        assert!(digest.contains("near a highway"));
    }

    #[test]
    fn drawing_digest_empty_drawing() {
        assert_eq!(
            drawing_digest(&Drawing::default()),
            "The drawing contains no geometry."
        );
    }

    #[test]
    fn drawing_only_without_drawing_says_no_geometry() {
        let input = PromptInput {
            question: "Describe my drawing",
            chunks: &[],
            drawing: None,
            drawing_updated_at: None,
            history: &[],
        };
        let messages = assembler().drawing_only(&input);
        assert!(messages[1].content.contains("no geometry"));
    }

    #[test]
    fn timestamp_instruction_present_when_supplied() {
        let drawing = sample_drawing();
        let input = PromptInput {
            question: "Describe my drawing",
            chunks: &[],
            drawing: Some(&drawing),
            drawing_updated_at: Some("2026-07-01T10:00:00Z"),
            history: &[],
        };
        let messages = assembler().drawing_only(&input);
        assert!(messages[1].content.contains("2026-07-01T10:00:00Z"));
    }

    #[test]
    fn compliance_boost_adds_instruction_block() {
        let drawing = sample_drawing();
        let chunks = vec![chunk("Depth limit is 6 m.", 0.9)];
        let input = PromptInput {
            question: "Is my extension compliant?",
            chunks: &chunks,
            drawing: Some(&drawing),
            drawing_updated_at: None,
            history: &[],
        };
        let boosted = assembler().standard_qa(&input, true);
        assert!(boosted[1].content.contains("COMPLIANCE question"));
        let plain = assembler().standard_qa(&input, false);
        assert!(!plain[1].content.contains("COMPLIANCE question"));
    }

    #[test]
    fn history_is_windowed_to_three_exchanges() {
        let mut history = Vec::new();
        for i in 0..5 {
            history.push(Message::user(format!("question {i}")));
            history.push(Message::assistant(format!("answer {i}")));
        }
        let input = PromptInput {
            question: "current",
            chunks: &[],
            drawing: None,
            drawing_updated_at: None,
            history: &history,
        };
        let messages = assembler().standard_qa(&input, false);
        // system + 3 exchanges (6 messages) + current user prompt
        assert_eq!(messages.len(), 8);
        assert_eq!(messages[1].content, "question 2");
        assert_eq!(messages[6].content, "answer 4");
    }

    #[test]
    fn agentic_system_lists_all_tools() {
        let tools = vec![
            ToolDefinition {
                name: "retrieve_regulations".into(),
                description: "Retrieve relevant building regulations. More detail.".into(),
                parameters: serde_json::json!({}),
            },
            ToolDefinition {
                name: "verify_compliance".into(),
                description: "Verify the drawing. More detail.".into(),
                parameters: serde_json::json!({}),
            },
        ];
        let system = assembler().agentic_system(&tools);
        assert!(system.contains("- retrieve_regulations: Retrieve relevant building regulations"));
        assert!(system.contains("- verify_compliance: Verify the drawing"));
        assert!(system.contains("Stop calling tools and respond in prose"));
    }

    #[test]
    fn agentic_user_includes_drawing_preview() {
        let drawing = sample_drawing();
        let user = assembler().agentic_user(
            "Is my extension too deep?",
            Some(&drawing),
            Some("2026-07-01T10:00:00Z"),
        );
        assert!(user.contains("User Question: Is my extension too deep?"));
        assert!(user.contains("Last updated: 2026-07-01T10:00:00Z"));
        assert!(user.contains("Drawing Preview:"));
    }

    #[test]
    fn compliance_template_demands_adjusted_json() {
        let drawing = sample_drawing();
        let chunks = vec![chunk("Depth limit is 6 m.", 0.9)];
        let input = PromptInput {
            question: "Provide a compliant JSON",
            chunks: &chunks,
            drawing: Some(&drawing),
            drawing_updated_at: None,
            history: &[],
        };
        let messages = assembler().compliance_with_adjustment(&input);
        let user = &messages[1].content;
        assert!(user.contains("ADJUSTED COMPLIANT JSON"));
        assert!(user.contains("RAW DRAWING DATA"));
    }
}
