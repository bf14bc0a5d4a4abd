//! Pattern-checked strings.

use crate::program::{Node, NodeId, Program};
use crate::registry::{Arity, ShapeFunction};
use crate::ui::UiGenerator;
use crate::validate::{Validator, type_name};
use crate::OperationError;
use regex::Regex;
use rhizome_jsonshapes_ir::WidgetNode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

const EMAIL_PATTERN: &str = r"^\S+@[^.\s]\S*\.[^.\s]{2,}$";

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"));

fn pattern_arg<'p>(args: &[NodeId], program: &'p Program) -> Option<&'p str> {
    match program.node(args[0]) {
        Node::Literal {
            value: Value::String(pattern),
        } => Some(pattern),
        _ => None,
    }
}

fn match_pattern(regex: &Regex, shown: &str, data: &Value, cx: &mut Validator<'_>) {
    match data {
        Value::String(s) if regex.is_match(s) => {}
        Value::String(_) => cx.error(format!("does not match pattern {shown}")),
        other => cx.error(format!("expected string, found {}", type_name(other))),
    }
}

/// `regexp("pattern")`: a string that starts with a match of the pattern.
///
/// Patterns are anchored at the start only, so `regexp("abc")` accepts
/// `"abcd"` but not `"xabc"`; add `$` to match the whole string.
#[derive(Default)]
pub(crate) struct Regexp {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl Regexp {
    /// The anchored regex for `pattern`, compiled once per distinct pattern.
    pub(crate) fn compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Ok(cache) = self.compiled.read() {
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }
        // the bare pattern must stand alone, or `a)|(b` would escape the group
        Regex::new(pattern)?;
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        if let Ok(mut cache) = self.compiled.write() {
            cache.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }

    pub(crate) fn cached(&self) -> usize {
        self.compiled.read().map_or(0, |cache| cache.len())
    }
}

impl ShapeFunction for Regexp {
    fn name(&self) -> &str {
        "regexp"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }

    fn check_args(&self, args: &[NodeId], program: &Program) -> Result<(), String> {
        let pattern = pattern_arg(args, program).ok_or("expected a string pattern")?;
        self.compile(pattern)
            .map(|_| ())
            .map_err(|e| format!("invalid pattern: {e}"))
    }

    fn validate(&self, args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        let Some(pattern) = pattern_arg(args, cx.program()) else {
            cx.error("regexp argument is not a string");
            return Ok(());
        };
        match self.compile(pattern) {
            Ok(regex) => match_pattern(&regex, pattern, data, cx),
            Err(e) => cx.error(format!("invalid pattern: {e}")),
        }
        Ok(())
    }

    fn ui(&self, args: &[NodeId], cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        let widget = WidgetNode::new("regexp", "text");
        Ok(match pattern_arg(args, cx.program()) {
            Some(pattern) => widget.prop("pattern", pattern),
            None => widget,
        })
    }
}

pub(crate) struct Email;

impl ShapeFunction for Email {
    fn name(&self) -> &str {
        "email"
    }

    fn arity(&self) -> Arity {
        Arity::exactly(0)
    }

    fn validate(&self, _args: &[NodeId], data: &Value, cx: &mut Validator<'_>) -> Result<(), OperationError> {
        match data {
            Value::String(s) if !EMAIL.is_match(s) => cx.error("expected an email address"),
            _ => match_pattern(&EMAIL, EMAIL_PATTERN, data, cx),
        }
        Ok(())
    }

    fn ui(&self, _args: &[NodeId], _cx: &mut UiGenerator<'_>) -> Result<WidgetNode, OperationError> {
        Ok(WidgetNode::new("email", "email"))
    }
}
