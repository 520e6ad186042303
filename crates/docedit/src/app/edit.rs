//! Edit requests, prompt rendering, reply parsing, and applying proposals.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use minijinja::Environment;
use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::errors::DomainError;
use crate::domain::model::{EditScope, Proposal, ResolvedRange};

const REJECTION_PREFIX: &str = "ERROR:";

/// Something that turns a rendered prompt into replacement text.
///
/// Implementations may answer with the `ERROR: <reason>` sentinel to decline a request;
/// transport failures are reported through `Err`.
pub trait EditSource {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// A user instruction paired with the text it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub prompt: String,
    pub scope: EditScope,
}

impl EditRequest {
    /// Target the resolved selection, or the whole document when there is none.
    pub fn new(prompt: impl Into<String>, selection: Option<ResolvedRange>) -> Self {
        let scope = match selection {
            Some(range) => EditScope::Selection { range },
            None => EditScope::Document,
        };
        Self {
            prompt: prompt.into(),
            scope,
        }
    }

    /// The text that will be replaced when the resulting proposal is accepted.
    pub fn target_text<'a>(&'a self, document: &'a str) -> &'a str {
        match &self.scope {
            EditScope::Selection { range } => &range.text,
            EditScope::Document => document,
        }
    }
}

/// Parsed reply from an [`EditSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditReply {
    Replacement(String),
    Rejected(String),
}

/// Interpret raw edit source output.
///
/// A reply starting with `ERROR:` (after leading whitespace) is a rejection carrying the
/// trimmed reason. Otherwise a single enclosing code fence is removed along with trailing
/// newlines; leading indentation of the replacement is preserved.
pub fn parse_reply(raw: &str) -> EditReply {
    let trimmed = raw.trim_start();
    if let Some(reason) = trimmed.strip_prefix(REJECTION_PREFIX) {
        return EditReply::Rejected(reason.trim().to_owned());
    }
    EditReply::Replacement(strip_code_fence(raw).trim_end_matches(['\n', '\r']).to_owned())
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return raw;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return raw;
    };
    // Drop the info string (e.g. "markdown") on the opening fence line.
    match body.split_once('\n') {
        Some((_, inner)) => inner,
        None => raw,
    }
}

/// Replace `source[start..end]` with `replacement`.
pub fn splice(
    source: &str,
    start: usize,
    end: usize,
    replacement: &str,
) -> Result<String, DomainError> {
    if start > end || end > source.len() {
        return Err(DomainError::RangeOutOfBounds {
            start,
            end,
            len: source.len(),
        });
    }
    if !source.is_char_boundary(start) || !source.is_char_boundary(end) {
        return Err(DomainError::NotCharBoundary { start, end });
    }

    let mut spliced = String::with_capacity(source.len() - (end - start) + replacement.len());
    spliced.push_str(&source[..start]);
    spliced.push_str(replacement);
    spliced.push_str(&source[end..]);
    Ok(spliced)
}

impl Proposal {
    /// Build a proposal from a request and the replacement text returned for it.
    pub fn from_reply(request: &EditRequest, document: &str, replacement: String) -> Self {
        Self {
            scope: request.scope.clone(),
            prompt: request.prompt.clone(),
            before: request.target_text(document).to_owned(),
            after: replacement,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Produce the document with this proposal applied.
    ///
    /// Proposals are re-validated against `document` first: a changed selection yields
    /// [`DomainError::StaleSelection`], a changed whole-document target
    /// [`DomainError::StaleDocument`].
    pub fn apply(&self, document: &str) -> Result<String, DomainError> {
        match &self.scope {
            EditScope::Selection { range } => {
                range.validate(document)?;
                splice(document, range.start, range.end, &self.after)
            }
            EditScope::Document if document != self.before => Err(DomainError::StaleDocument),
            EditScope::Document => Ok(self.after.clone()),
        }
    }
}

/// Renders edit prompts from built-in or file-based templates.
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl PromptRenderer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            env: default_environment()?,
        })
    }

    /// Render the prompt for `request`.
    ///
    /// When `template` is `None` the built-in template matching the request scope is
    /// used. Otherwise `template` names a built-in template or a path to one on disk.
    pub fn render(
        &self,
        request: &EditRequest,
        document: &str,
        template: Option<&str>,
    ) -> Result<String> {
        let context = PromptContext {
            instruction: request.prompt.trim(),
            scope: request.scope.label(),
            target: request.target_text(document),
            document,
        };
        let name = template.unwrap_or(match request.scope {
            EditScope::Selection { .. } => "selection_edit",
            EditScope::Document => "document_edit",
        });
        self.render_with_template(&context, name)
    }

    fn render_with_template(
        &self,
        context: &PromptContext<'_>,
        template_name: &str,
    ) -> Result<String> {
        if let Ok(template) = self.env.get_template(template_name) {
            return template
                .render(context)
                .map_err(|err| anyhow!("failed to render template '{template_name}': {err}"));
        }

        let template_path = Path::new(template_name);
        if template_path.exists() {
            let source = fs::read_to_string(template_path).with_context(|| {
                format!("failed to load template from path {}", template_path.display())
            })?;
            let mut env = Environment::new();
            env.set_trim_blocks(true);
            env.set_lstrip_blocks(true);
            env.add_template("external", &source)
                .map_err(|err| anyhow!("invalid template '{template_name}': {err}"))?;
            let template = env
                .get_template("external")
                .map_err(|err| anyhow!("failed to load template '{template_name}': {err}"))?;
            return template
                .render(context)
                .map_err(|err| anyhow!("failed to render template '{template_name}': {err}"));
        }

        Err(anyhow!("template '{template_name}' not found (built-in or filesystem)"))
    }
}

fn default_environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("selection_edit", SELECTION_TEMPLATE)
        .map_err(|err| anyhow!("failed to register selection template: {err}"))?;
    env.add_template("document_edit", DOCUMENT_TEMPLATE)
        .map_err(|err| anyhow!("failed to register document template: {err}"))?;
    Ok(env)
}

#[derive(Serialize)]
struct PromptContext<'a> {
    instruction: &'a str,
    scope: &'a str,
    target: &'a str,
    document: &'a str,
}

const SELECTION_TEMPLATE: &str = r#"You are editing a Markdown document that may contain LaTeX math.
Rewrite only the excerpt below according to the instruction.
Reply with the replacement text only. If the instruction cannot be applied, reply with "ERROR: " followed by the reason.

Instruction: {{ instruction }}

Excerpt:
{{ target }}
"#;

const DOCUMENT_TEMPLATE: &str = r#"You are editing a Markdown document that may contain LaTeX math.
Rewrite the whole document according to the instruction.
Reply with the complete revised document only. If the instruction cannot be applied, reply with "ERROR: " followed by the reason.

Instruction: {{ instruction }}

Document:
{{ document }}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    use crate::app::resolve::resolve;

    struct Recorded {
        reply: String,
        prompts: RefCell<Vec<String>>,
    }

    impl EditSource for Recorded {
        fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_owned());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn splice_replaces_range() {
        assert_eq!(splice("hello world", 6, 11, "there").unwrap(), "hello there");
        assert_eq!(splice("abc", 0, 0, "x").unwrap(), "xabc");
        assert_eq!(splice("abc", 3, 3, "x").unwrap(), "abcx");
    }

    #[test]
    fn splice_rejects_invalid_ranges() {
        assert_eq!(
            splice("abc", 2, 5, "x"),
            Err(DomainError::RangeOutOfBounds { start: 2, end: 5, len: 3 })
        );
        assert!(splice("abc", 2, 1, "x").is_err());
        assert_eq!(
            splice("ñ", 1, 2, "x"),
            Err(DomainError::NotCharBoundary { start: 1, end: 2 })
        );
    }

    #[test]
    fn parse_reply_detects_error_sentinel() {
        assert_eq!(
            parse_reply("  ERROR: instruction is ambiguous\n"),
            EditReply::Rejected("instruction is ambiguous".into())
        );
        assert_eq!(
            parse_reply("An ERROR: inside text\n"),
            EditReply::Replacement("An ERROR: inside text".into())
        );
    }

    #[test]
    fn parse_reply_strips_code_fence() {
        assert_eq!(
            parse_reply("```markdown\n$$a^2 + b^2$$\n```\n"),
            EditReply::Replacement("$$a^2 + b^2$$".into())
        );
        assert_eq!(
            parse_reply("  indented\n\n"),
            EditReply::Replacement("  indented".into())
        );
    }

    #[test]
    fn proposal_applies_to_selection() {
        let document = "Intro.\n\nLet $x = 1$ hold.\n";
        let range = resolve(document, "Let $x = 1$ hold.").unwrap();
        let request = EditRequest::new("use y", Some(range));
        let proposal = Proposal::from_reply(&request, document, "Let $y = 1$ hold.".into());

        assert_eq!(proposal.before, "Let $x = 1$ hold.");
        assert_eq!(proposal.apply(document).unwrap(), "Intro.\n\nLet $y = 1$ hold.\n");
    }

    #[test]
    fn proposal_rejects_stale_document() {
        let document = "alpha beta";
        let range = resolve(document, "beta").unwrap();
        let request = EditRequest::new("shout", Some(range));
        let proposal = Proposal::from_reply(&request, document, "BETA".into());

        assert!(matches!(
            proposal.apply("alpha  beta"),
            Err(DomainError::StaleSelection { .. })
        ));
    }

    #[test]
    fn document_proposal_replaces_everything() {
        let request = EditRequest::new("rewrite", None);
        let proposal = Proposal::from_reply(&request, "old", "new".into());
        assert_eq!(proposal.before, "old");
        assert_eq!(proposal.apply("old").unwrap(), "new");
    }

    #[test]
    fn document_proposal_rejects_changed_document() {
        let request = EditRequest::new("rewrite", None);
        let proposal = Proposal::from_reply(&request, "old", "new".into());
        assert_eq!(proposal.apply("old, edited"), Err(DomainError::StaleDocument));
    }

    #[test]
    fn renders_scope_specific_prompts() {
        let renderer = PromptRenderer::new().unwrap();
        let document = "First.\nSecond.";
        let range = resolve(document, "Second.").unwrap();

        let selection = EditRequest::new("  make it bold ", Some(range));
        let prompt = renderer.render(&selection, document, None).unwrap();
        assert!(prompt.contains("Instruction: make it bold"));
        assert!(prompt.contains("Excerpt:\nSecond."));
        assert!(!prompt.contains("First."));

        let whole = EditRequest::new("fix typos", None);
        let prompt = renderer.render(&whole, document, None).unwrap();
        assert!(prompt.contains("Document:\nFirst.\nSecond."));
    }

    #[test]
    fn renders_template_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.j2");
        fs::write(&path, "[{{ scope }}] {{ instruction }} :: {{ target }}").unwrap();

        let renderer = PromptRenderer::new().unwrap();
        let request = EditRequest::new("shorten", None);
        let prompt = renderer
            .render(&request, "body", Some(path.to_str().unwrap()))
            .unwrap();
        assert_eq!(prompt, "[document] shorten :: body");
    }

    #[test]
    fn unknown_template_is_an_error() {
        let renderer = PromptRenderer::new().unwrap();
        let request = EditRequest::new("x", None);
        assert!(renderer.render(&request, "doc", Some("no_such_template")).is_err());
    }

    #[test]
    fn edit_source_receives_rendered_prompt() {
        let source = Recorded {
            reply: "ERROR: refusing".into(),
            prompts: RefCell::new(Vec::new()),
        };
        let renderer = PromptRenderer::new().unwrap();
        let request = EditRequest::new("translate", None);
        let prompt = renderer.render(&request, "Bonjour", None).unwrap();

        let reply = parse_reply(&source.complete(&prompt).unwrap());
        assert_eq!(reply, EditReply::Rejected("refusing".into()));
        assert!(source.prompts.borrow()[0].contains("Bonjour"));
    }
}
