//! Registered blocks and patterns.
//!
//! Ported block-for-block, pattern-for-pattern, from
//! `original_source/blocks/{input,output,text,list,dict,condition}.py` and
//! `original_source/patterns/comparator.py`. Registration here replaces the
//! original's `@block`/`@pattern` decorators: each descriptor below states
//! explicitly what the decorator previously inferred from a constructor/call
//! signature.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::block::{Bindings, Block, Context};
use crate::error::BlockError;
use crate::instance::{ConstructArgs, Instance, SlotArg};
use crate::pattern::{Condition, LlmModel, Pattern};
use crate::registry::RegistryBuilder;
use crate::types::{Category, ParamKind, PortDescriptor, SlotDescriptor, TypeDescriptor};
use crate::value::Value;

fn slot_llm(args: &ConstructArgs, name: &str) -> Result<Arc<dyn LlmModel>, String> {
    args.get(name).and_then(SlotArg::as_llm).cloned().ok_or_else(|| format!("missing model slot {name}"))
}

fn slot_text(args: &ConstructArgs, name: &str) -> Result<String, String> {
    args.get(name)
        .and_then(SlotArg::as_value)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("missing or non-text slot {name}"))
}

fn slot_text_or(args: &ConstructArgs, name: &str, default: &str) -> String {
    args.get(name)
        .and_then(SlotArg::as_value)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

fn slot_comparator(args: &ConstructArgs, name: &str) -> Result<Arc<dyn Condition>, String> {
    args.get(name)
        .and_then(SlotArg::as_pattern)
        .cloned()
        .ok_or_else(|| format!("missing comparator slot {name}"))
}

fn binding_or_null(bindings: &Bindings, name: &str) -> Value {
    bindings.get(name).cloned().unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------
// Input blocks
// ---------------------------------------------------------------------

/// An input block's value is set once, out-of-band, by the scheduler before
/// the graph runs; `invoke` then just hands it back.
#[derive(Debug, Default)]
struct StoredInput {
    value: Mutex<Value>,
}

#[async_trait]
impl Block for StoredInput {
    async fn invoke(&self, _bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
        Ok(self.value.lock().clone())
    }

    fn is_input(&self) -> bool {
        true
    }

    fn set_input(&self, value: Value) {
        *self.value.lock() = value;
    }
}

fn register_input_block(builder: &mut RegistryBuilder, name: &str, outport: &str) {
    builder.register(
        TypeDescriptor {
            name: name.to_string(),
            alias: name.to_string(),
            category: Category::Block,
            dir: Some("input".into()),
            impl_tag: format!("builtins::{name}"),
            abstract_: false,
            implements: Vec::new(),
            displayable: true,
            slots: Vec::new(),
            inports: Vec::new(),
            outport: Some(outport.to_string()),
        },
        Arc::new(|_args: ConstructArgs| Ok(Instance::Block(Arc::new(StoredInput::default())))),
    );
}

// ---------------------------------------------------------------------
// Output block
// ---------------------------------------------------------------------

/// The unique exit point of a graph: returns its `input` port unchanged,
/// absorbing any other bound ports (`original_source/blocks/output.py`'s
/// `**ignore`).
#[derive(Debug)]
struct TextOutput;

#[async_trait]
impl Block for TextOutput {
    async fn invoke(&self, bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
        Ok(binding_or_null(&bindings, "input"))
    }

    fn is_output(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------
// Number/Text/List comparator patterns
// ---------------------------------------------------------------------

macro_rules! number_comparator {
    ($struct_name:ident, $check:expr) => {
        #[derive(Debug)]
        struct $struct_name {
            value: f64,
        }

        impl Pattern for $struct_name {
            fn type_name(&self) -> &'static str {
                stringify!($struct_name)
            }
        }

        impl Condition for $struct_name {
            fn check(&self, input: &Value) -> bool {
                let Some(n) = input.as_f64() else { return false };
                let target = self.value;
                let check: fn(f64, f64) -> bool = $check;
                check(n, target)
            }
        }
    };
}

number_comparator!(GreaterOrEqualThan, |n, t| n >= t);
number_comparator!(LessOrEqualThan, |n, t| n <= t);
number_comparator!(GreaterThan, |n, t| n > t);
number_comparator!(LessThan, |n, t| n < t);
number_comparator!(EqualWithNumber, |n, t| n == t);

macro_rules! text_comparator {
    ($struct_name:ident, $check:expr) => {
        #[derive(Debug)]
        struct $struct_name {
            value: String,
        }

        impl Pattern for $struct_name {
            fn type_name(&self) -> &'static str {
                stringify!($struct_name)
            }
        }

        impl Condition for $struct_name {
            fn check(&self, input: &Value) -> bool {
                let Some(s) = input.as_str() else { return false };
                let check: fn(&str, &str) -> bool = $check;
                check(s, &self.value)
            }
        }
    };
}

text_comparator!(TextEqual, |s, t| s == t);
text_comparator!(TextContains, |s, t| s.contains(t));
text_comparator!(TextHasPrefix, |s, t| s.starts_with(t));
text_comparator!(TextHasSuffix, |s, t| s.ends_with(t));

#[derive(Debug)]
struct ListContains {
    value: String,
}

impl Pattern for ListContains {
    fn type_name(&self) -> &'static str {
        "ListContains"
    }
}

impl Condition for ListContains {
    fn check(&self, input: &Value) -> bool {
        input.as_array().map(|items| items.iter().any(|v| v.as_str() == Some(self.value.as_str()))).unwrap_or(false)
    }
}

#[derive(Debug)]
struct ListIsEmpty;

impl Pattern for ListIsEmpty {
    fn type_name(&self) -> &'static str {
        "ListIsEmpty"
    }
}

impl Condition for ListIsEmpty {
    fn check(&self, input: &Value) -> bool {
        input.as_array().map(|items| items.is_empty()).unwrap_or(false)
    }
}

fn register_number_comparator(
    builder: &mut RegistryBuilder,
    name: &str,
    ctor: impl Fn(f64) -> Arc<dyn Condition> + Send + Sync + 'static,
) {
    register_comparator(builder, name, "NumberComparator", "int", move |args| {
        let value = args
            .get("value")
            .and_then(SlotArg::as_value)
            .and_then(Value::as_f64)
            .ok_or_else(|| "missing or non-numeric slot value".to_string())?;
        Ok(Instance::Pattern(ctor(value)))
    });
}

fn register_text_comparator(
    builder: &mut RegistryBuilder,
    name: &str,
    ctor: impl Fn(String) -> Arc<dyn Condition> + Send + Sync + 'static,
) {
    register_comparator(builder, name, "TextComparator", "text", move |args| {
        Ok(Instance::Pattern(ctor(slot_text(&args, "value")?)))
    });
}

fn register_comparator(
    builder: &mut RegistryBuilder,
    name: &str,
    implements: &str,
    value_type: &str,
    constructor: impl Fn(ConstructArgs) -> Result<Instance, String> + Send + Sync + 'static,
) {
    builder.register(
        TypeDescriptor {
            name: name.to_string(),
            alias: name.to_string(),
            category: Category::Type,
            dir: None,
            impl_tag: format!("builtins::{name}"),
            abstract_: false,
            implements: vec![implements.to_string()],
            displayable: true,
            slots: vec![SlotDescriptor::required("value", value_type)],
            inports: Vec::new(),
            outport: None,
        },
        Arc::new(constructor),
    );
}

fn register_abstract_comparator(builder: &mut RegistryBuilder, name: &str) {
    builder.register_abstract(TypeDescriptor {
        name: name.to_string(),
        alias: name.to_string(),
        category: Category::Type,
        dir: None,
        impl_tag: format!("builtins::abstract::{name}"),
        abstract_: true,
        implements: Vec::new(),
        displayable: true,
        slots: Vec::new(),
        inports: Vec::new(),
        outport: None,
    });
}

// ---------------------------------------------------------------------
// Condition blocks
// ---------------------------------------------------------------------

#[derive(Debug)]
struct ConditionBlock {
    comparator: Arc<dyn Condition>,
}

#[async_trait]
impl Block for ConditionBlock {
    async fn invoke(&self, bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
        let input = binding_or_null(&bindings, "input");
        Ok(Value::Bool(self.comparator.check(&input)))
    }
}

fn register_condition_block(builder: &mut RegistryBuilder, name: &str, input_type: &str, implements: &str) {
    let implements = implements.to_string();
    builder.register(
        TypeDescriptor {
            name: name.to_string(),
            alias: name.to_string(),
            category: Category::Block,
            dir: Some("condition".into()),
            impl_tag: format!("builtins::{name}"),
            abstract_: false,
            implements: Vec::new(),
            displayable: true,
            slots: vec![SlotDescriptor::required("comparator", implements.clone())],
            inports: vec![PortDescriptor::required("input", input_type)],
            outport: Some("bool".into()),
        },
        Arc::new(move |args: ConstructArgs| {
            let comparator = slot_comparator(&args, "comparator")?;
            Ok(Instance::Block(Arc::new(ConditionBlock { comparator })))
        }),
    );
}

// ---------------------------------------------------------------------
// Data-process blocks
// ---------------------------------------------------------------------

/// `Dict_KeySelect_to_Text`: selects one key out of a dict-shaped input,
/// returning `null` (not an error) when the key is absent
/// (`original_source/blocks/dict.py`).
#[derive(Debug)]
struct KeySelector {
    key: String,
}

#[async_trait]
impl Block for KeySelector {
    async fn invoke(&self, bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
        let messages = binding_or_null(&bindings, "messages");
        Ok(messages.get(&self.key).cloned().unwrap_or(Value::Null))
    }
}

/// `List_Jion_to_Text`: zips its variadic-keyword bindings positionally and
/// formats each tuple through `template`, joining with `delimiter`. Returns
/// `null` when nothing was bound — matching the original's `len(kwargs) == 0`
/// early return (`original_source/blocks/list.py`).
#[derive(Debug)]
struct JoinList {
    template: String,
    delimiter: String,
}

#[async_trait]
impl Block for JoinList {
    async fn invoke(&self, bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
        if bindings.is_empty() {
            return Ok(Value::Null);
        }
        let keys: Vec<&String> = bindings.keys().collect();
        let columns: Vec<Vec<Value>> = keys
            .iter()
            .map(|k| {
                bindings[*k]
                    .as_array()
                    .cloned()
                    .ok_or_else(|| BlockError::new(format!("port {k} is not a list")))
            })
            .collect::<Result<_, _>>()?;

        let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
        let mut lines = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut context = serde_json::Map::new();
            for (col, key) in columns.iter().zip(keys.iter()) {
                context.insert((*key).clone(), col[row].clone());
            }
            lines.push(format_template(&self.template, &context));
        }
        Ok(Value::String(lines.join(&self.delimiter)))
    }
}

/// A minimal `{name}`-style formatter — the only templating the original's
/// `str.format(**dict)` call needed here.
fn format_template(template: &str, context: &serde_json::Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            let mut key = String::new();
            for next in chars.by_ref() {
                if next == '}' {
                    break;
                }
                key.push(next);
            }
            let rendered = context
                .get(&key)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            out.push_str(&rendered);
        } else {
            out.push(c);
        }
    }
    out
}

/// `List_Concat_to_List`: concatenates two declared lists, in order
/// (`original_source/blocks/list.py`).
#[derive(Debug)]
struct ConcatList;

#[async_trait]
impl Block for ConcatList {
    async fn invoke(&self, bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
        let seq1 = binding_or_null(&bindings, "seq1");
        let seq2 = binding_or_null(&bindings, "seq2");
        let mut out = seq1.as_array().cloned().ok_or_else(|| BlockError::new("seq1 is not a list"))?;
        out.extend(seq2.as_array().cloned().ok_or_else(|| BlockError::new("seq2 is not a list"))?);
        Ok(Value::Array(out))
    }
}

/// `Text_split_to_List`: splits `text` on `delim` after trimming `prefix`/
/// `suffix`, dropping blank segments (`original_source/blocks/text.py`).
#[derive(Debug)]
struct ListParser {
    delim: String,
    prefix: String,
    suffix: String,
}

#[async_trait]
impl Block for ListParser {
    async fn invoke(&self, bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
        let text = binding_or_null(&bindings, "text");
        let text = text.as_str().ok_or_else(|| BlockError::new("text is not a string"))?.trim();
        let text = text.strip_prefix(self.prefix.as_str()).unwrap_or(text);
        let text = text.strip_suffix(self.suffix.as_str()).unwrap_or(text);
        let items: Vec<Value> = text
            .split(self.delim.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect();
        Ok(Value::Array(items))
    }
}

/// `Text_Join_to_Dict`: folds every bound keyword port straight into a dict
/// (`original_source/blocks/text.py`).
#[derive(Debug)]
struct ComposeDict;

#[async_trait]
impl Block for ComposeDict {
    async fn invoke(&self, bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
        let mut map = serde_json::Map::new();
        for (k, v) in bindings {
            map.insert(k, v);
        }
        Ok(Value::Object(map))
    }
}

// ---------------------------------------------------------------------
// LLM model pattern and LLM call block
// ---------------------------------------------------------------------

/// `Mock_LLM`: a test double for the abstract `LlmModel` pattern, always
/// returning its configured `mock_output` regardless of the rendered prompt
/// (`original_source/plugins/mock_llm.py`). Useful for developing and
/// testing an Application's DAG before wiring in a real provider.
#[derive(Debug)]
struct MockLlm {
    mock_output: String,
}

impl Pattern for MockLlm {
    fn type_name(&self) -> &'static str {
        "MockLlm"
    }
}

impl LlmModel for MockLlm {
    fn complete(&self, _prompt: &str) -> Result<String, BlockError> {
        Ok(self.mock_output.clone())
    }
}

/// `LLM`: renders `prompt_template` with `text` plus any absorbed keyword
/// ports, then calls the `model` slot's [`LlmModel::complete`]
/// (`original_source/blocks/llm.py`'s `LLMChain.__call__`). The real
/// provider wrappers this composes against are an explicit Non-goal; the
/// registry only ever holds `MockLlm` plus whatever `LlmModel` a deployment
/// links in.
#[derive(Debug)]
struct LlmBlock {
    model: Arc<dyn LlmModel>,
    prompt_template: String,
}

#[async_trait]
impl Block for LlmBlock {
    async fn invoke(&self, bindings: Bindings, _ctx: &Context) -> Result<Value, BlockError> {
        let mut context = serde_json::Map::new();
        for (k, v) in &bindings {
            context.insert(k.clone(), v.clone());
        }
        let prompt = format_template(&self.prompt_template, &context);
        let completion = self.model.complete(&prompt).map_err(|e| BlockError::llm(e.to_string()))?;
        Ok(Value::String(completion))
    }
}

// ---------------------------------------------------------------------
// Installation
// ---------------------------------------------------------------------

/// Registers every builtin block and pattern. Called once from
/// [`crate::registry::Registry::bootstrap`].
pub fn install(builder: &mut RegistryBuilder) {
    register_input_block(builder, "TextInput", "text");
    register_input_block(builder, "ListInput", "list");
    register_input_block(builder, "DictInput", "dict");

    builder.register(
        TypeDescriptor {
            name: "Output".to_string(),
            alias: "Output".to_string(),
            category: Category::Block,
            dir: Some("output".into()),
            impl_tag: "builtins::Output".to_string(),
            abstract_: false,
            implements: Vec::new(),
            displayable: true,
            slots: Vec::new(),
            inports: vec![
                PortDescriptor::required("input", "text"),
                PortDescriptor { name: "ignore".into(), type_tag: "any".into(), default: None, kind: ParamKind::VariadicKeyword },
            ],
            outport: Some("text".into()),
        },
        Arc::new(|_args: ConstructArgs| Ok(Instance::Block(Arc::new(TextOutput)))),
    );

    register_abstract_comparator(builder, "NumberComparator");
    register_number_comparator(builder, "GreaterOrEqualThan", |v| Arc::new(GreaterOrEqualThan { value: v }));
    register_number_comparator(builder, "LessOrEqualThan", |v| Arc::new(LessOrEqualThan { value: v }));
    register_number_comparator(builder, "GreaterThan", |v| Arc::new(GreaterThan { value: v }));
    register_number_comparator(builder, "LessThan", |v| Arc::new(LessThan { value: v }));
    register_number_comparator(builder, "EqualWithNumber", |v| Arc::new(EqualWithNumber { value: v }));

    register_abstract_comparator(builder, "TextComparator");
    register_text_comparator(builder, "TextEqual", |v| Arc::new(TextEqual { value: v }));
    register_text_comparator(builder, "TextContains", |v| Arc::new(TextContains { value: v }));
    register_text_comparator(builder, "TextHasPrefix", |v| Arc::new(TextHasPrefix { value: v }));
    register_text_comparator(builder, "TextHasSuffix", |v| Arc::new(TextHasSuffix { value: v }));

    register_abstract_comparator(builder, "ListComparator");
    register_comparator(builder, "ListContains", "ListComparator", "text", |args| {
        Ok(Instance::Pattern(Arc::new(ListContains { value: slot_text(&args, "value")? })))
    });
    builder.register(
        TypeDescriptor {
            name: "ListIsEmpty".to_string(),
            alias: "ListIsEmpty".to_string(),
            category: Category::Type,
            dir: None,
            impl_tag: "builtins::ListIsEmpty".to_string(),
            abstract_: false,
            implements: vec!["ListComparator".to_string()],
            displayable: true,
            slots: Vec::new(),
            inports: Vec::new(),
            outport: None,
        },
        Arc::new(|_args: ConstructArgs| Ok(Instance::Pattern(Arc::new(ListIsEmpty)))),
    );

    register_condition_block(builder, "NumberCondition", "int", "NumberComparator");
    register_condition_block(builder, "TextCondition", "text", "TextComparator");
    register_condition_block(builder, "ListCondition", "list", "ListComparator");

    builder.register(
        TypeDescriptor {
            name: "KeySelector".to_string(),
            alias: "KeySelector".to_string(),
            category: Category::Block,
            dir: Some("data process".into()),
            impl_tag: "builtins::KeySelector".to_string(),
            abstract_: false,
            implements: Vec::new(),
            displayable: true,
            slots: vec![SlotDescriptor::required("key", "text")],
            inports: vec![PortDescriptor::required("messages", "dict")],
            outport: Some("any".into()),
        },
        Arc::new(|args: ConstructArgs| Ok(Instance::Block(Arc::new(KeySelector { key: slot_text(&args, "key")? })))),
    );

    builder.register(
        TypeDescriptor {
            name: "JoinList".to_string(),
            alias: "JoinList".to_string(),
            category: Category::Block,
            dir: Some("data process".into()),
            impl_tag: "builtins::JoinList".to_string(),
            abstract_: false,
            implements: Vec::new(),
            displayable: true,
            slots: vec![
                SlotDescriptor::required("template", "text"),
                SlotDescriptor::with_default("delimiter", "text", Value::String("\n".into())),
            ],
            inports: vec![PortDescriptor { name: "kwargs".into(), type_tag: "list".into(), default: None, kind: ParamKind::VariadicKeyword }],
            outport: Some("text".into()),
        },
        Arc::new(|args: ConstructArgs| {
            Ok(Instance::Block(Arc::new(JoinList {
                template: slot_text(&args, "template")?,
                delimiter: slot_text_or(&args, "delimiter", "\n"),
            })))
        }),
    );

    builder.register(
        TypeDescriptor {
            name: "ConcatList".to_string(),
            alias: "ConcatList".to_string(),
            category: Category::Block,
            dir: Some("data process".into()),
            impl_tag: "builtins::ConcatList".to_string(),
            abstract_: false,
            implements: Vec::new(),
            displayable: true,
            slots: Vec::new(),
            inports: vec![PortDescriptor::required("seq1", "list"), PortDescriptor::required("seq2", "list")],
            outport: Some("list".into()),
        },
        Arc::new(|_args: ConstructArgs| Ok(Instance::Block(Arc::new(ConcatList)))),
    );

    builder.register(
        TypeDescriptor {
            name: "ListParser".to_string(),
            alias: "ListParser".to_string(),
            category: Category::Block,
            dir: Some("data process".into()),
            impl_tag: "builtins::ListParser".to_string(),
            abstract_: false,
            implements: Vec::new(),
            displayable: true,
            slots: vec![
                SlotDescriptor::required("delim", "text"),
                SlotDescriptor::with_default("prefix", "text", Value::String(String::new())),
                SlotDescriptor::with_default("suffix", "text", Value::String(String::new())),
            ],
            inports: vec![PortDescriptor::required("text", "text")],
            outport: Some("list".into()),
        },
        Arc::new(|args: ConstructArgs| {
            Ok(Instance::Block(Arc::new(ListParser {
                delim: slot_text(&args, "delim")?,
                prefix: slot_text_or(&args, "prefix", ""),
                suffix: slot_text_or(&args, "suffix", ""),
            })))
        }),
    );

    builder.register_abstract(TypeDescriptor {
        name: "LlmModel".to_string(),
        alias: "LlmModel".to_string(),
        category: Category::Type,
        dir: None,
        impl_tag: "builtins::abstract::LlmModel".to_string(),
        abstract_: true,
        implements: Vec::new(),
        displayable: true,
        slots: Vec::new(),
        inports: Vec::new(),
        outport: None,
    });
    builder.register(
        TypeDescriptor {
            name: "MockLlm".to_string(),
            alias: "MockLlm".to_string(),
            category: Category::Type,
            dir: None,
            impl_tag: "builtins::MockLlm".to_string(),
            abstract_: false,
            implements: vec!["LlmModel".to_string()],
            displayable: true,
            slots: vec![SlotDescriptor::required("mock_output", "text")],
            inports: Vec::new(),
            outport: None,
        },
        Arc::new(|args: ConstructArgs| {
            Ok(Instance::Llm(Arc::new(MockLlm { mock_output: slot_text(&args, "mock_output")? })))
        }),
    );
    builder.register(
        TypeDescriptor {
            name: "LLM".to_string(),
            alias: "LLM".to_string(),
            category: Category::Block,
            dir: Some("llm".into()),
            impl_tag: "builtins::LLM".to_string(),
            abstract_: false,
            implements: Vec::new(),
            displayable: true,
            slots: vec![
                SlotDescriptor::required("model", "LlmModel"),
                SlotDescriptor::required("prompt_template", "text"),
            ],
            inports: vec![
                PortDescriptor::required("text", "text"),
                PortDescriptor { name: "kwargs".into(), type_tag: "text".into(), default: None, kind: ParamKind::VariadicKeyword },
            ],
            outport: Some("text".into()),
        },
        Arc::new(|args: ConstructArgs| {
            Ok(Instance::Block(Arc::new(LlmBlock {
                model: slot_llm(&args, "model")?,
                prompt_template: slot_text(&args, "prompt_template")?,
            })))
        }),
    );

    builder.register(
        TypeDescriptor {
            name: "ComposeDict".to_string(),
            alias: "ComposeDict".to_string(),
            category: Category::Block,
            dir: Some("data process".into()),
            impl_tag: "builtins::ComposeDict".to_string(),
            abstract_: false,
            implements: Vec::new(),
            displayable: true,
            slots: Vec::new(),
            inports: vec![PortDescriptor { name: "kwargs".into(), type_tag: "text".into(), default: None, kind: ParamKind::VariadicKeyword }],
            outport: Some("dict".into()),
        },
        Arc::new(|_args: ConstructArgs| Ok(Instance::Block(Arc::new(ComposeDict)))),
    );
}
