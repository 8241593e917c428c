//! Parsed type expressions such as `Dictionary<String, List<oM.Geometry.Point>>`.

use std::fmt;
use std::str::FromStr;

use crate::errors::{ModelError, ModelResult};
use crate::value::{Document, ValueNode};

/// A type name together with its (possibly empty) generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    name: String,
    args: Vec<TypeName>,
}

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        TypeName {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeName>) -> Self {
        TypeName {
            name: name.into(),
            args,
        }
    }

    /// Parse `Name` or `Name<Arg, Arg<...>>`
    pub fn parse(input: &str) -> ModelResult<Self> {
        let mut pos = 0;
        let parsed = parse_at(input, &mut pos).map_err(|reason| ModelError::SerializationError {
            reason: format!("invalid type name '{}': {}", input, reason),
        })?;
        if !input[pos..].trim().is_empty() {
            return Err(ModelError::SerializationError {
                reason: format!("invalid type name '{}': trailing input at {}", input, pos),
            });
        }
        Ok(parsed)
    }

    /// Read a type reference written either as a string or as a type
    /// document `{ Name, GenericArguments, Constraints }`.
    ///
    /// Null or unreadable generic arguments are dropped; constraints are
    /// advisory and not carried.
    pub fn from_node(node: &ValueNode) -> Option<Self> {
        match node {
            ValueNode::String(s) => TypeName::parse(s).ok(),
            ValueNode::Map(doc) => TypeName::from_document(doc),
            _ => None,
        }
    }

    pub fn from_document(doc: &Document) -> Option<Self> {
        let name = doc.get("Name").and_then(ValueNode::as_str)?;
        let mut parsed = TypeName::parse(name).ok()?;
        if let Some(ValueNode::Array(args)) = doc.get("GenericArguments") {
            parsed.args = args.iter().filter_map(TypeName::from_node).collect();
        }
        if let Some(ValueNode::Array(constraints)) = doc.get("Constraints") {
            tracing::trace!(
                type_name = %parsed,
                constraints = constraints.len(),
                "ignoring advisory generic constraints"
            );
        }
        Some(parsed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[TypeName] {
        &self.args
    }

    /// Last dotted segment of the name
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }
}

/// Last dotted segment of a type name
pub fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn parse_at(s: &str, pos: &mut usize) -> Result<TypeName, String> {
    let bytes = s.as_bytes();
    let start = *pos;
    while *pos < bytes.len() && !matches!(bytes[*pos], b'<' | b'>' | b',') {
        *pos += 1;
    }
    let name = s[start..*pos].trim();
    if name.is_empty() {
        return Err(format!("expected a name at {}", start));
    }

    let mut args = Vec::new();
    if bytes.get(*pos) == Some(&b'<') {
        *pos += 1;
        loop {
            args.push(parse_at(s, pos)?);
            match bytes.get(*pos) {
                Some(b',') => *pos += 1,
                Some(b'>') => {
                    *pos += 1;
                    break;
                }
                _ => return Err("unterminated generic argument list".to_string()),
            }
        }
        // whitespace between '>' and the next delimiter
        while bytes.get(*pos).is_some_and(|b| b.is_ascii_whitespace()) {
            *pos += 1;
        }
    }

    Ok(TypeName {
        name: name.to_string(),
        args,
    })
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl FromStr for TypeName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeName::parse(s)
    }
}

impl From<&str> for TypeName {
    /// Infallible conversion for declared member types; an unparsable
    /// string becomes a plain name that simply fails to resolve later.
    fn from(s: &str) -> Self {
        TypeName::parse(s).unwrap_or_else(|_| TypeName::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_name() {
        let name = TypeName::parse("oM.Geometry.Point").unwrap();
        assert_eq!(name.name(), "oM.Geometry.Point");
        assert_eq!(name.short_name(), "Point");
        assert!(name.args().is_empty());
    }

    #[test]
    fn test_parse_nested_generics() {
        let name = TypeName::parse("Dictionary<String, List<oM.Geometry.Point>>").unwrap();
        assert_eq!(name.name(), "Dictionary");
        assert_eq!(name.args().len(), 2);
        assert_eq!(name.args()[1].name(), "List");
        assert_eq!(name.args()[1].args()[0].name(), "oM.Geometry.Point");
        assert_eq!(name.to_string(), "Dictionary<String, List<oM.Geometry.Point>>");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(TypeName::parse("List<Point").is_err());
        assert!(TypeName::parse("").is_err());
        assert!(TypeName::parse("List<Point>>").is_err());
    }

    #[test]
    fn test_from_type_document() {
        let doc = Document::new()
            .with("Name", "List")
            .with("GenericArguments", ValueNode::Array(vec![ValueNode::from("Point"), ValueNode::Null]));
        let name = TypeName::from_document(&doc).unwrap();
        assert_eq!(name.to_string(), "List<Point>");
    }
}
