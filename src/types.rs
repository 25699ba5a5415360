use crate::token::Span;
use serde::Serialize;
use std::fmt;

#[derive(Debug, PartialEq, Clone, Serialize)]
pub enum DataType {
    Bool,
    Int,
    Float,
    String,
    Object(String), // Any script name, e.g. Actor or ObjectReference
}

/// A type as written in source, e.g. `Int`, `Actor[]`.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Type {
    pub data_type: DataType,
    pub is_array: bool,
    pub span: Span,
}

impl Type {
    pub fn new(data_type: DataType, is_array: bool, span: Span) -> Self {
        Self {
            data_type,
            is_array,
            span,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "Bool"),
            DataType::Int => write!(f, "Int"),
            DataType::Float => write!(f, "Float"),
            DataType::String => write!(f, "String"),
            DataType::Object(name) => write!(f, "{}", name),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_array {
            write!(f, "{}[]", self.data_type)
        } else {
            write!(f, "{}", self.data_type)
        }
    }
}
