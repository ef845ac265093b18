//! Operator, modifier and literal payloads carried by AST nodes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Binary operator kinds, named the way Java tooling conventionally names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperatorKind {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    InstanceOf,
    Shl,
    Shr,
    UShr,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
}

impl BinaryOperatorKind {
    pub const ALL: [BinaryOperatorKind; 20] = [
        BinaryOperatorKind::Or,
        BinaryOperatorKind::And,
        BinaryOperatorKind::BitOr,
        BinaryOperatorKind::BitXor,
        BinaryOperatorKind::BitAnd,
        BinaryOperatorKind::Eq,
        BinaryOperatorKind::Ne,
        BinaryOperatorKind::Lt,
        BinaryOperatorKind::Gt,
        BinaryOperatorKind::Le,
        BinaryOperatorKind::Ge,
        BinaryOperatorKind::InstanceOf,
        BinaryOperatorKind::Shl,
        BinaryOperatorKind::Shr,
        BinaryOperatorKind::UShr,
        BinaryOperatorKind::Plus,
        BinaryOperatorKind::Minus,
        BinaryOperatorKind::Mul,
        BinaryOperatorKind::Div,
        BinaryOperatorKind::Mod,
    ];

    /// Source token for this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperatorKind::Or => "||",
            BinaryOperatorKind::And => "&&",
            BinaryOperatorKind::BitOr => "|",
            BinaryOperatorKind::BitXor => "^",
            BinaryOperatorKind::BitAnd => "&",
            BinaryOperatorKind::Eq => "==",
            BinaryOperatorKind::Ne => "!=",
            BinaryOperatorKind::Lt => "<",
            BinaryOperatorKind::Gt => ">",
            BinaryOperatorKind::Le => "<=",
            BinaryOperatorKind::Ge => ">=",
            BinaryOperatorKind::InstanceOf => "instanceof",
            BinaryOperatorKind::Shl => "<<",
            BinaryOperatorKind::Shr => ">>",
            BinaryOperatorKind::UShr => ">>>",
            BinaryOperatorKind::Plus => "+",
            BinaryOperatorKind::Minus => "-",
            BinaryOperatorKind::Mul => "*",
            BinaryOperatorKind::Div => "/",
            BinaryOperatorKind::Mod => "%",
        }
    }

    /// Upper-case name used in transformation scripts (`PLUS`, `MINUS`, ...).
    pub fn name(self) -> &'static str {
        match self {
            BinaryOperatorKind::Or => "OR",
            BinaryOperatorKind::And => "AND",
            BinaryOperatorKind::BitOr => "BITOR",
            BinaryOperatorKind::BitXor => "BITXOR",
            BinaryOperatorKind::BitAnd => "BITAND",
            BinaryOperatorKind::Eq => "EQ",
            BinaryOperatorKind::Ne => "NE",
            BinaryOperatorKind::Lt => "LT",
            BinaryOperatorKind::Gt => "GT",
            BinaryOperatorKind::Le => "LE",
            BinaryOperatorKind::Ge => "GE",
            BinaryOperatorKind::InstanceOf => "INSTANCEOF",
            BinaryOperatorKind::Shl => "SL",
            BinaryOperatorKind::Shr => "SR",
            BinaryOperatorKind::UShr => "USR",
            BinaryOperatorKind::Plus => "PLUS",
            BinaryOperatorKind::Minus => "MINUS",
            BinaryOperatorKind::Mul => "MUL",
            BinaryOperatorKind::Div => "DIV",
            BinaryOperatorKind::Mod => "MOD",
        }
    }

    /// Binding strength; larger binds tighter. Assignment is 1 and the
    /// conditional operator 2, so every binary operator sits above them.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperatorKind::Or => 3,
            BinaryOperatorKind::And => 4,
            BinaryOperatorKind::BitOr => 5,
            BinaryOperatorKind::BitXor => 6,
            BinaryOperatorKind::BitAnd => 7,
            BinaryOperatorKind::Eq | BinaryOperatorKind::Ne => 8,
            BinaryOperatorKind::Lt
            | BinaryOperatorKind::Gt
            | BinaryOperatorKind::Le
            | BinaryOperatorKind::Ge
            | BinaryOperatorKind::InstanceOf => 9,
            BinaryOperatorKind::Shl | BinaryOperatorKind::Shr | BinaryOperatorKind::UShr => 10,
            BinaryOperatorKind::Plus | BinaryOperatorKind::Minus => 11,
            BinaryOperatorKind::Mul | BinaryOperatorKind::Div | BinaryOperatorKind::Mod => 12,
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.symbol() == symbol)
    }

    /// Operator used by a compound assignment token such as `+=`.
    pub fn from_compound_assignment(token: &str) -> Option<Self> {
        let symbol = token.strip_suffix('=')?;
        match Self::from_symbol(symbol)? {
            kind @ (BinaryOperatorKind::BitOr
            | BinaryOperatorKind::BitXor
            | BinaryOperatorKind::BitAnd
            | BinaryOperatorKind::Shl
            | BinaryOperatorKind::Shr
            | BinaryOperatorKind::UShr
            | BinaryOperatorKind::Plus
            | BinaryOperatorKind::Minus
            | BinaryOperatorKind::Mul
            | BinaryOperatorKind::Div
            | BinaryOperatorKind::Mod) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for BinaryOperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BinaryOperatorKind {
    type Err = String;

    /// Accepts either the upper-case name (case-insensitive) or the symbol.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(trimmed) || kind.symbol() == trimmed)
            .ok_or_else(|| format!("unknown binary operator '{trimmed}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperatorKind {
    Pos,
    Neg,
    Not,
    Compl,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOperatorKind {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperatorKind::Pos => "+",
            UnaryOperatorKind::Neg => "-",
            UnaryOperatorKind::Not => "!",
            UnaryOperatorKind::Compl => "~",
            UnaryOperatorKind::PreInc | UnaryOperatorKind::PostInc => "++",
            UnaryOperatorKind::PreDec | UnaryOperatorKind::PostDec => "--",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            UnaryOperatorKind::Pos => "POS",
            UnaryOperatorKind::Neg => "NEG",
            UnaryOperatorKind::Not => "NOT",
            UnaryOperatorKind::Compl => "COMPL",
            UnaryOperatorKind::PreInc => "PREINC",
            UnaryOperatorKind::PreDec => "PREDEC",
            UnaryOperatorKind::PostInc => "POSTINC",
            UnaryOperatorKind::PostDec => "POSTDEC",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOperatorKind::PostInc | UnaryOperatorKind::PostDec)
    }

    /// Whether the operator writes back to its operand.
    pub fn is_update(self) -> bool {
        matches!(
            self,
            UnaryOperatorKind::PreInc
                | UnaryOperatorKind::PreDec
                | UnaryOperatorKind::PostInc
                | UnaryOperatorKind::PostDec
        )
    }
}

impl fmt::Display for UnaryOperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declaration modifiers. The derived ordering is the canonical print order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModifierKind {
    Public,
    Protected,
    Private,
    Abstract,
    Static,
    Final,
    Transient,
    Volatile,
    Synchronized,
    Native,
    Strictfp,
    Default,
}

impl ModifierKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ModifierKind::Public => "public",
            ModifierKind::Protected => "protected",
            ModifierKind::Private => "private",
            ModifierKind::Abstract => "abstract",
            ModifierKind::Static => "static",
            ModifierKind::Final => "final",
            ModifierKind::Transient => "transient",
            ModifierKind::Volatile => "volatile",
            ModifierKind::Synchronized => "synchronized",
            ModifierKind::Native => "native",
            ModifierKind::Strictfp => "strictfp",
            ModifierKind::Default => "default",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "public" => ModifierKind::Public,
            "protected" => ModifierKind::Protected,
            "private" => ModifierKind::Private,
            "abstract" => ModifierKind::Abstract,
            "static" => ModifierKind::Static,
            "final" => ModifierKind::Final,
            "transient" => ModifierKind::Transient,
            "volatile" => ModifierKind::Volatile,
            "synchronized" => ModifierKind::Synchronized,
            "native" => ModifierKind::Native,
            "strictfp" => ModifierKind::Strictfp,
            "default" => ModifierKind::Default,
            _ => return None,
        })
    }
}

impl fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

pub type Modifiers = BTreeSet<ModifierKind>;

/// Build a modifier set from keywords, ignoring anything that is not a modifier.
pub fn modifiers_from<'a>(keywords: impl IntoIterator<Item = &'a str>) -> Modifiers {
    keywords
        .into_iter()
        .filter_map(|keyword| ModifierKind::from_keyword(&keyword.to_ascii_lowercase()))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    /// `// text`
    Line,
    /// `/* text */`
    Block,
    /// `/** text */`
    Javadoc,
}

/// A comment attached to the node that follows it in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comment {
    pub kind: CommentKind,
    /// Text between the delimiters, verbatim.
    pub text: String,
}

impl Comment {
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            kind: CommentKind::Line,
            text: text.into(),
        }
    }

    pub fn block(text: impl Into<String>) -> Self {
        Self {
            kind: CommentKind::Block,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Import {
    /// Dotted path without a trailing `.*`.
    pub path: String,
    pub is_static: bool,
    pub wildcard: bool,
}
