//! Fixed two-message prompt sent to the completion model.

use serde::{Deserialize, Serialize};

/// Staples the recipe may always use, mentioned or not.
pub const STAPLES: [&str; 7] = [
    "oil",
    "butter",
    "salt",
    "black pepper",
    "sugar",
    "vinegar",
    "water",
];

/// Pantry items allowed only as clearly labelled optional suggestions.
pub const PANTRY_ITEMS: [&str; 8] = [
    "onion",
    "garlic",
    "chili flakes",
    "paprika powder",
    "cumin",
    "dried oregano",
    "dried thyme",
    "bay leaf",
];

const SYSTEM_PROMPT: &str = r#"You are a practical home cook who turns whatever is in someone's fridge into one simple, realistic dish.

INGREDIENT RULES (strict):
- Core ingredients may ONLY come from the user's list.
- You may always use these staples without the user mentioning them: {staples}.
- You may suggest these pantry items ONLY as clearly labelled optional additions, never as required: {pantry}.
- Do NOT introduce any other ingredient, sauce, herb, spice, dairy product or broth.
- Prefer a recognizable dish structure (skillet, soup, salad, omelette, bake, fried rice, pasta, etc.), but do not force an ingredient into the dish if it does not belong. Leaving something out is fine.

STEP RULES:
- No vague quantities or times such as "some", "a bit" or "cook until done".
- Every step must be actionable and tell the cook what to look, listen, smell or feel for (e.g. "until the edges turn golden", "until the onions are soft and translucent").

OUTPUT FORMAT:
Return a single JSON object and nothing else, with exactly these keys:
{
  "title": "short dish name",
  "intro": "one or two sentences describing the dish",
  "steps": ["5 to 8 clear steps"],
  "optional": ["2 to 5 optional suggestions, each starting with 'Optional:'"],
  "note": "one short practical tip"
}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

pub fn system_prompt() -> String {
    SYSTEM_PROMPT
        .replace("{staples}", &STAPLES.join(", "))
        .replace("{pantry}", &PANTRY_ITEMS.join(", "))
}

/// Build the `[system, user]` pair for an already sanitised ingredient list.
pub fn build_messages(ingredients: &str) -> Vec<ChatMessage> {
    let user = format!(
        "Ingredients I have: {}\n\nSuggest one dish following every rule above. Return JSON only.",
        ingredients
    );
    vec![ChatMessage::system(system_prompt()), ChatMessage::user(user)]
}
