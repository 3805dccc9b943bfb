//! Prompt text sent to the language model.

use nyay_core::session::CollectedFields;

/// Appended to every guidance answer and to the form summary.
pub const DISCLAIMER: &str = "**Disclaimer:** I am an AI assistant and not a qualified lawyer. \
This information is for educational purposes only and should not be considered as legal advice. \
Please consult with a professional lawyer for any legal action or decision.";

/// Render answers as `- label: value` lines, one per field.
pub fn bullet_list(collected: &CollectedFields) -> String {
    collected
        .iter()
        .map(|entry| format!("- {}: {}", entry.label, entry.value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn legal_guidance(query: &str) -> String {
    format!(
        r#"You are Nyay Sahayak, an assistant that explains Indian law in plain language.

Guidelines:
1. Work out which legal issues the question raises.
2. Walk through the relevant provisions or procedure step by step.
3. Avoid jargon. When a legal term is unavoidable, explain it right away.
4. If the question is too vague to answer, ask a clarifying question.
5. Always finish with a line containing only `---` followed by this disclaimer:
{DISCLAIMER}

The user's question: "{query}""#
    )
}

pub fn form_start(first_field: &str) -> String {
    format!(
        r#"You are helping a user fill in a demonstration First Information Report (FIR).
Ask for one field at a time. After each question, explain in one or two simple sentences why that detail matters legally.
Begin by asking for the first field: "{first_field}"."#
    )
}

pub fn form_continue(next_field: &str, collected: &CollectedFields) -> String {
    format!(
        r#"You are helping a user fill in a demonstration First Information Report (FIR).
Details collected so far:
{collected}

The user has just answered the previous question. Ask for the next field: **'{next_field}'**.
Then briefly explain, in simple terms, why it matters legally."#,
        collected = bullet_list(collected),
    )
}

pub fn form_finalize(collected: &CollectedFields) -> String {
    format!(
        r#"All details for the demonstration FIR have been collected. Produce a summary in exactly this structure:

1. One short introductory sentence in English.
2. On a new line, a JSON object inside a ```json fenced block.
3. The object has a single key "fir_data": an array of objects, one per field, each with a "label" (the field name) and a "value" (the user's answer).
4. After the closing fence, on a new line, `---` followed by the disclaimer.
5. Nothing else: no extra text, formatting or commentary.

Collected details:
{collected}

Expected shape:
Here is the summary of your demonstration FIR.
```json
{{
  "fir_data": [
    {{"label": "Complainant's Name", "value": "Asha Verma"}},
    {{"label": "Father's/Husband's Name", "value": "Mohan Verma"}}
  ]
}}
```
---
{DISCLAIMER}"#,
        collected = bullet_list(collected),
    )
}

/// Translation request for text that is safe to send whole.
pub fn translate_plain(text: &str) -> String {
    format!(
        "Translate the following English text into Hindi. Do not translate markdown like `**` or `---`. \
Reply with the translation only.\n\n{text}"
    )
}

/// Translation request for one prose fragment of a form summary.
pub fn translate_fragment(text: &str) -> String {
    format!("Translate the following English text into Hindi. Reply with the translation only: '{text}'")
}
