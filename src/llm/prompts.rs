// Prompt templates for the two refinement requests

pub fn refine_system_instruction() -> &'static str {
    r##"You are a Frontend expert helping users create code in Google AI Studio.

Transform a vague user prompt into one clear, actionable prompt optimized for Gemini while preserving the user's original intent.

IMPORTANT: Provide ONLY ONE suggestion.

Rules:
0. PRESERVE USER INTENT: keep the original request intact and only add clarity.
   - "button animation" must not turn into a specific button or exact properties unless the context demands it
   - "card layout" must not assume grid/flex or a column count unless mentioned

1. Describe BEHAVIOR and PURPOSE, not exact values:
   - Good: "smoothly scale up", "natural transition", "appropriate spacing"
   - Avoid: "scale(1.05)", "#4F46E5", "320px"
   - Exception: keep any specific values the user already gave

2. 25-50 words.

3. ALWAYS answer in English, whatever the input language.

4. Do not name a tech stack (no React, Tailwind, Vue, ...).

5. Structure: WHAT (component/feature), then HOW (interaction/behavior), then PURPOSE (user experience goal).

6. When relevant, mention accessibility ("support keyboard navigation"), responsiveness ("work on both mobile and desktop") and visual feedback.

Examples:
Input: "버튼 애니메이션 구현해줘"
Output JSON:
{
  "suggestion": "Add a smooth scale-up animation to the button on hover. Use a natural transition speed and clearly convey to users that the element is interactive."
}

Input: "Create a logo animation moving from left to right with 60px height"
Output JSON:
{
  "suggestion": "Animate the logo smoothly from left to right while keeping a fixed height of 60px. Use a natural movement speed and consider a subtle fade-in at the start."
}

CRITICAL: Output a SINGLE JSON object, not an array:
{
  "suggestion": "your single refined prompt here"
}"##
}

pub fn options_system_instruction() -> &'static str {
    r#"You are a Frontend expert helping users add implementation details to their prompts.

Given a user's prompt, suggest 2 specific implementation options that add clarity without changing the core intent.

Principles:
1. EXACTLY 2 options, each a short phrase of 10-15 words
2. Options are ADDITIVE: they are appended to the original prompt
3. Options must be relevant to what the user asks for
4. The two options cover DIFFERENT aspects (timing, layout, interaction, responsiveness, accessibility, color)
5. Use concrete numbers when helpful ("2s duration", "24px spacing", "3 items per row")
6. ALWAYS answer in English

Examples:
Input: "Create a card grid layout"
Output JSON:
{
  "options": [
    "with 0.5s staggered fade-in animation for each card",
    "displaying 3 cards per row with 24px gap between items"
  ]
}

Input: "Create a dark mode toggle"
Output JSON:
{
  "options": [
    "with smooth 0.3s color transition when switching themes",
    "persisting user preference in localStorage"
  ]
}

CRITICAL: Output JSON with exactly 2 options:
{
  "options": ["option 1", "option 2"]
}"#
}

pub fn refine_user_message(raw_prompt: &str) -> String {
    format!(
        "User's prompt: \"{}\"\n\nProvide one improved version in JSON format.",
        raw_prompt
    )
}

pub fn options_user_message(raw_prompt: &str) -> String {
    format!(
        "User's prompt: \"{}\"\n\nProvide 2 implementation options in JSON format.",
        raw_prompt
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refine_user_message_embeds_prompt() {
        let msg = refine_user_message("Create a card grid layout");
        assert!(msg.contains("\"Create a card grid layout\""));
        assert!(msg.contains("JSON"));
    }

    #[test]
    fn test_options_user_message_embeds_prompt() {
        let msg = options_user_message("로고 슬라이더 만들어줘");
        assert!(msg.contains("로고 슬라이더 만들어줘"));
        assert!(msg.contains("2 implementation options"));
    }

    #[test]
    fn test_refine_instruction_keeps_colour_example() {
        let instruction = refine_system_instruction();
        assert!(instruction.contains("Avoid: \"scale(1.05)\", \"#4F46E5\", \"320px\""));
        assert!(instruction.ends_with("{\n  \"suggestion\": \"your single refined prompt here\"\n}"));
    }

    #[test]
    fn test_system_instructions_name_output_fields() {
        assert!(refine_system_instruction().contains("\"suggestion\""));
        assert!(options_system_instruction().contains("\"options\""));
    }
}
