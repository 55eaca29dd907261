//! Prompt text for the model calls made by the automation layer

use serde_json::Value;

/// System prompt for locating elements in a rendered accessibility tree
pub const RESOLVER_SYSTEM_PROMPT: &str = r#"You locate elements on a web page.
You are given an accessibility tree where every line looks like:
[nodeId] role: text (property=value ...)

Match the user's description against roles and text:
- A "combobox" is a dropdown or a search input with suggestions. Treat search boxes,
  autocomplete fields, and location pickers as comboboxes or textboxes.
- "textbox" and "searchbox" accept typed input; "button" and "link" are clicked.
- When the description implies interaction (click, type, select, press), only return
  interactive roles. Never return a StaticText node for an interactive description.
- Prefer the most specific match. Return several elements only when the description
  asks for several.
- Only use nodeIds that appear in the tree. Do not invent ids.

Respond with a JSON object of this exact shape:
{"elements": [
  {"nodeId": <number>, "description": "<what the element is>", "confidence": <0 to 1>}
]}

If nothing matches, respond with {"elements": []}."#;

pub fn resolver_user_prompt(instruction: &str, tree: &str) -> String {
    format!(
        "Find the elements matching this description: {}\n\nAccessibility tree:\n{}",
        instruction, tree
    )
}

/// System prompt for turning one instruction into atomic actions
pub const ACT_SYSTEM_PROMPT: &str = r#"You turn a browser instruction into an ordered list
of atomic actions.

Allowed actions:
- {"action": "click", "target": "<element description>"}
- {"action": "type", "target": "<element description>", "value": "<text>"}
- {"action": "select", "target": "<element description>", "value": "<option>"}
- {"action": "press", "key": "<key name, e.g. Enter>"} with an optional "target"
- {"action": "clear", "target": "<element description>"}

Rules:
- Keep the order the instruction implies. One action per step.
- Describe targets by role and visible text, e.g. "search combobox labelled 'Search jobs'".
- Omit "target" for press or type when the action applies to whatever has focus.

Examples:
Instruction: click the search box then type "rust developer"
{"actions": [
  {"action": "click", "target": "search box"},
  {"action": "type", "target": "search box", "value": "rust developer"}
]}

Instruction: type "Berlin" into the location field and press Enter
{"actions": [
  {"action": "type", "target": "location field", "value": "Berlin"},
  {"action": "press", "key": "Enter"}
]}

Instruction: press Enter
{"actions": [{"action": "press", "key": "Enter"}]}

Respond with a JSON object: {"actions": [...]}"#;

pub fn act_user_prompt(instruction: &str) -> String {
    format!("Instruction: {}", instruction)
}

/// System prompt for schema-shaped extraction
pub const EXTRACT_SYSTEM_PROMPT: &str = r#"You extract structured data from web page content.

Rules:
- Extract every instance of repeated items (for example every job listing), not only the first one.
- Copy text exactly as it appears in the source. Do not summarise or rephrase.
- Use null for any field that is not present. Never guess.
- URLs must be absolute, including scheme and host.

Respond with a single JSON object."#;

pub fn extract_user_prompt(instruction: &str, content: &str, schema: Option<&Value>) -> String {
    let mut prompt = format!("Instruction: {}\n", instruction);
    if let Some(schema) = schema {
        let schema = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
        prompt.push_str(&format!("\nThe JSON object must match this JSON Schema:\n{}\n", schema));
    }
    prompt.push_str(&format!("\nPage content:\n{}", content));
    prompt
}

/// Element query used to decide whether a page wants the user to log in
pub const AUTH_DETECTION_INSTRUCTION: &str = "all login, sign in, sign up, join, password, \
or other authentication related elements, including social login buttons such as \
'Continue with Google'";
