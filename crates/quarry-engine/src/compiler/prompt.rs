//! Prompt construction for the language model.

use quarry_core::types::{
    BackendFamily, BackendKind, ConversationRole, ConversationTurn, Permission, SchemaEntity,
};

/// Everything the prompt embeds.
pub struct PromptInput<'a> {
    pub question: &'a str,
    pub backend: BackendKind,
    pub database: &'a str,
    pub entity: &'a SchemaEntity,
    pub context: &'a [ConversationTurn],
    pub permission: Permission,
}

fn dialect_hints(backend: BackendKind) -> &'static [&'static str] {
    match backend {
        BackendKind::MongoDb => &[
            "Target is MongoDB. Reply with a find specification or an aggregation pipeline, never shell syntax.",
            "A find is a JSON object with optional keys: filter, projection, sort, limit.",
            "A pipeline is a JSON array of single-key stage objects ($match, $group, $sort, $limit, ...).",
            "Use extended JSON for dates and ObjectIds, e.g. {\"$date\": \"2024-01-01T00:00:00Z\"}.",
        ],
        BackendKind::Postgres => &[
            "Target is PostgreSQL. Reply with a single SQL statement as a string.",
            "Quote identifiers with double quotes when they contain capitals. Use LIMIT, ILIKE, and date_trunc where useful.",
        ],
        BackendKind::MySql => &[
            "Target is MySQL. Reply with a single SQL statement as a string.",
            "Quote identifiers with backticks. Use LIMIT and DATE_FORMAT where useful.",
        ],
        BackendKind::Sqlite => &[
            "Target is SQLite. Reply with a single SQL statement as a string.",
            "Dates are text or unix epochs; use strftime/date(). Use LIMIT for row caps.",
        ],
    }
}

fn permission_rule(permission: Permission) -> &'static str {
    if permission.allows_mutation() {
        "The caller may modify data, but prefer read-only queries unless the question explicitly asks for a change."
    } else {
        "The caller is read-only. Never produce statements or stages that insert, update, delete, drop, or otherwise modify data or schema."
    }
}

fn role_label(role: ConversationRole) -> &'static str {
    match role {
        ConversationRole::User => "User",
        ConversationRole::Assistant => "Assistant",
    }
}

/// Build the prompt. `context` should already be cut to the last N turns.
pub fn build_prompt(input: &PromptInput<'_>) -> String {
    let entity = input.entity;
    let noun = input.backend.entity_noun();
    let mut prompt = String::new();

    prompt.push_str("You translate questions about a database into one query.\n\n");

    prompt.push_str("## Dialect\n");
    for hint in dialect_hints(input.backend) {
        prompt.push_str("- ");
        prompt.push_str(hint);
        prompt.push('\n');
    }
    prompt.push('\n');

    prompt.push_str("## Schema\n");
    prompt.push_str(&format!(
        "Database `{}`, {} `{}` (about {} rows).\n",
        input.database, noun, entity.name, entity.estimated_rows
    ));
    prompt.push_str("Fields:\n");
    for field in &entity.fields {
        let mut flags = Vec::new();
        if field.primary_key {
            flags.push("primary key");
        }
        if !field.nullable {
            flags.push("not null");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        prompt.push_str(&format!("  - `{}`: {}{}\n", field.name, field.field_type, flags));
    }
    if !entity.indexes.is_empty() {
        prompt.push_str("Indexes:\n");
        for index in &entity.indexes {
            let unique = if index.unique { " unique" } else { "" };
            prompt.push_str(&format!(
                "  - `{}`{} on ({})\n",
                index.name,
                unique,
                index.fields.join(", ")
            ));
        }
    }
    prompt.push('\n');

    prompt.push_str("## Rules\n");
    prompt.push_str("- ");
    prompt.push_str(permission_rule(input.permission));
    prompt.push('\n');
    prompt.push_str(&format!(
        "- Query only the {} `{}`. Add a limit unless the question needs every row.\n\n",
        noun, entity.name
    ));

    if !input.context.is_empty() {
        prompt.push_str("## Conversation so far\n");
        for turn in input.context {
            prompt.push_str(&format!("{}: {}\n", role_label(turn.role), turn.content.trim()));
        }
        prompt.push('\n');
    }

    prompt.push_str("## Question\n");
    prompt.push_str(input.question.trim());
    prompt.push_str("\n\n");

    prompt.push_str("## Reply format\n");
    prompt.push_str("Reply with exactly one JSON object and nothing else:\n");
    prompt.push_str("{\n");
    match input.backend.family() {
        BackendFamily::Relational => {
            prompt.push_str("  \"query\": \"<SQL statement>\",\n");
            prompt.push_str("  \"kind\": \"sql\",\n");
        }
        BackendFamily::Document => {
            prompt.push_str("  \"query\": <find object or pipeline array>,\n");
            prompt.push_str("  \"kind\": \"find\" | \"pipeline\",\n");
        }
    }
    prompt.push_str("  \"explain\": \"<one or two sentences in plain language>\",\n");
    prompt.push_str("  \"safety\": \"safe\" | \"warning\" | \"unsafe\",\n");
    prompt.push_str("  \"estimatedCost\": <number between 0 and 1>,\n");
    prompt.push_str("  \"requiresIndexes\": [<field names that would benefit from an index>]\n");
    prompt.push_str("}\n");

    prompt
}
