use crate::ast::BinaryOperatorKind;
use crate::oracle::Value;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// A transformation script: which sources to load, what to change and how
/// the result is expected to behave.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct TransformScript {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub transforms: Vec<TransformDefinition>,
    #[serde(default)]
    pub expect: Vec<Expectation>,
}

impl TransformScript {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.transforms.is_empty() {
            issues.push(ValidationIssue::EmptyTransformList);
        }
        if self.meta.inputs.is_empty() {
            issues.push(ValidationIssue::MissingField {
                transform_id: None,
                field: "meta.inputs",
            });
        }

        let mut seen = HashSet::new();
        for transform in &self.transforms {
            let id = Some(transform.id.clone());
            if transform.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    transform_id: None,
                    field: "id",
                });
            } else if !seen.insert(transform.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId(transform.id.clone()));
            }

            let needs_class = !matches!(transform.operation, Operation::ReplaceOperator { .. });
            let class_missing = transform
                .class
                .as_deref()
                .map_or(true, |class| class.trim().is_empty());
            if needs_class && class_missing {
                issues.push(ValidationIssue::MissingField {
                    transform_id: id.clone(),
                    field: "class",
                });
            }

            match &transform.operation {
                Operation::ReplaceOperator { from, to } => {
                    for symbol in [from, to] {
                        if symbol.parse::<BinaryOperatorKind>().is_err() {
                            issues.push(ValidationIssue::UnknownOperator {
                                transform_id: id.clone(),
                                operator: symbol.clone(),
                            });
                        }
                    }
                    let parsed = (
                        from.parse::<BinaryOperatorKind>(),
                        to.parse::<BinaryOperatorKind>(),
                    );
                    if matches!(parsed, (Ok(a), Ok(b)) if a == b) {
                        issues.push(ValidationIssue::InvalidCombo {
                            transform_id: id.clone(),
                            message: "replace-operator from and to are the same operator"
                                .to_string(),
                        });
                    }
                }
                Operation::DeleteMethod { name } => {
                    if name.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            transform_id: id.clone(),
                            field: "operation.name",
                        });
                    }
                }
                Operation::AddMembers { code } => {
                    if code.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            transform_id: id.clone(),
                            field: "operation.code",
                        });
                    }
                }
                Operation::ReplaceBody { method, body: _ } => {
                    if method.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            transform_id: id.clone(),
                            field: "operation.method",
                        });
                    }
                }
            }
        }

        for (index, expectation) in self.expect.iter().enumerate() {
            if expectation.class.trim().is_empty() {
                issues.push(ValidationIssue::InvalidExpectation {
                    index,
                    message: "missing class".to_string(),
                });
            }
            if expectation.method.trim().is_empty() {
                issues.push(ValidationIssue::InvalidExpectation {
                    index,
                    message: "missing method".to_string(),
                });
            }
            if expectation.returns.is_some() && expectation.throws.is_some() {
                issues.push(ValidationIssue::InvalidExpectation {
                    index,
                    message: "returns and throws cannot both be set".to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Files or directories to transform, relative to the script.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Directories parsed for reference only.
    #[serde(default)]
    pub classpath: Vec<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    /// Cross-check printed units with the tree-sitter Java grammar.
    #[serde(default = "default_true")]
    pub validate_output: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransformDefinition {
    pub id: String,
    /// Qualified or simple type name. Operator sweeps without a class cover
    /// every input unit.
    #[serde(default)]
    pub class: Option<String>,
    pub operation: Operation,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    /// Rewrite every binary operator of one kind. Accepts symbols (`+`) or
    /// names (`PLUS`).
    ReplaceOperator { from: String, to: String },
    /// Delete every method with this simple name.
    DeleteMethod { name: String },
    /// Splice fields and methods from member source text.
    AddMembers { code: String },
    /// Swap a method's body for these statements.
    ReplaceBody { method: String, body: String },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::ReplaceOperator { .. } => "replace-operator",
            Operation::DeleteMethod { .. } => "delete-method",
            Operation::AddMembers { .. } => "add-members",
            Operation::ReplaceBody { .. } => "replace-body",
        }
    }
}

/// Behaviour the transformed class must show when run.
#[derive(Debug, Deserialize, Clone)]
pub struct Expectation {
    pub class: String,
    pub method: String,
    #[serde(default)]
    pub returns: Option<ExpectedValue>,
    /// Exact text printed to `System.out`.
    #[serde(default)]
    pub output: Option<String>,
    /// Exception name, simple or qualified.
    #[serde(default)]
    pub throws: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ExpectedValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ExpectedValue {
    /// Compare against a returned Java value. Text matches strings by
    /// content and anything else by its printed form.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ExpectedValue::Bool(expected), _) => value.as_bool() == Some(*expected),
            (ExpectedValue::Integer(expected), Value::Int(v)) => i64::from(*v) == *expected,
            (ExpectedValue::Integer(expected), Value::Long(v)) => v == expected,
            (ExpectedValue::Float(expected), Value::Double(v)) => v == expected,
            (ExpectedValue::Float(expected), Value::Float(v)) => f64::from(*v) == *expected,
            (ExpectedValue::Text(expected), Value::Str(v)) => &**v == expected.as_str(),
            (ExpectedValue::Text(expected), other) => other.to_string() == *expected,
            _ => false,
        }
    }
}

impl fmt::Display for ExpectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedValue::Bool(v) => write!(f, "{v}"),
            ExpectedValue::Integer(v) => write!(f, "{v}"),
            ExpectedValue::Float(v) => write!(f, "{v}"),
            ExpectedValue::Text(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyTransformList,
    MissingField {
        transform_id: Option<String>,
        field: &'static str,
    },
    DuplicateId(String),
    UnknownOperator {
        transform_id: Option<String>,
        operator: String,
    },
    InvalidCombo {
        transform_id: Option<String>,
        message: String,
    },
    InvalidExpectation {
        index: usize,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyTransformList => {
                write!(f, "transformation script contains no transforms")
            }
            ValidationIssue::MissingField {
                transform_id,
                field,
            } => match transform_id {
                Some(id) => write!(f, "transform '{id}' missing required field '{field}'"),
                None => write!(f, "missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId(id) => write!(f, "transform id '{id}' is used twice"),
            ValidationIssue::UnknownOperator {
                transform_id,
                operator,
            } => match transform_id {
                Some(id) => write!(f, "transform '{id}' names unknown operator '{operator}'"),
                None => write!(f, "unknown operator '{operator}'"),
            },
            ValidationIssue::InvalidCombo {
                transform_id,
                message,
            } => match transform_id {
                Some(id) => write!(f, "transform '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid transform configuration: {message}"),
            },
            ValidationIssue::InvalidExpectation { index, message } => {
                write!(f, "expectation #{} is invalid: {message}", index + 1)
            }
        }
    }
}
