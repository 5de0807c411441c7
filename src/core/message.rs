use serde::{Deserialize, Serialize};

pub type SenderId = u32;
pub type ClassId = u16;
pub type MessageId = u16;

/// Decoded value of a single message field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Numeric view of a scalar value (arrays and non-numeric text yield None)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Array(_) => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldValue::Array(_))
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValue::Array(items) => items.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element of an array value, or the value itself when `index` is None
    pub fn element(&self, index: Option<usize>) -> Option<&FieldValue> {
        match (self, index) {
            (FieldValue::Array(items), Some(i)) => items.get(i),
            (FieldValue::Array(_), None) => None,
            (value, None) => Some(value),
            (_, Some(_)) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{:?}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// One field of a decoded message, with the metadata the message
/// definitions attach to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageField {
    pub name: String,
    /// Type as written in the message definitions (e.g. "int32", "uint8[]")
    pub type_str: String,
    pub value: FieldValue,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub alt_unit: Option<String>,
    #[serde(default)]
    pub alt_unit_coef: Option<f64>,
    /// Label of the current value when the field is an enumeration
    #[serde(default)]
    pub enum_label: Option<String>,
    /// printf-style display format
    #[serde(default)]
    pub format: Option<String>,
}

impl MessageField {
    pub fn new(name: impl Into<String>, type_str: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            type_str: type_str.into(),
            value,
            unit: None,
            alt_unit: None,
            alt_unit_coef: None,
            enum_label: None,
            format: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_alt_unit(mut self, alt_unit: impl Into<String>, coef: f64) -> Self {
        self.alt_unit = Some(alt_unit.into());
        self.alt_unit_coef = Some(coef);
        self
    }

    pub fn with_enum_label(mut self, label: impl Into<String>) -> Self {
        self.enum_label = Some(label.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn is_array(&self) -> bool {
        self.type_str.contains('[') || self.value.is_array()
    }

    pub fn is_enum(&self) -> bool {
        self.enum_label.is_some()
    }

    /// Scale advertised to plot consumers: the alternate-unit coefficient, or 1
    pub fn scale(&self) -> f64 {
        self.alt_unit_coef.unwrap_or(1.0)
    }
}

/// A message as delivered by the message-definition library: identity,
/// names and ordered fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMessage {
    pub class_id: ClassId,
    pub class_name: String,
    pub message_id: MessageId,
    pub name: String,
    pub fields: Vec<MessageField>,
}

impl DecodedMessage {
    pub fn new(
        class_id: ClassId,
        class_name: impl Into<String>,
        message_id: MessageId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            class_id,
            class_name: class_name.into(),
            message_id,
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: MessageField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&MessageField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Text line as it travels on the bus (`"<sender> <NAME> <values...>"`),
    /// used by transports to match subscription patterns
    pub fn bus_line(&self, sender: &str) -> String {
        let mut line = format!("{} {}", sender, self.name);
        for field in &self.fields {
            line.push(' ');
            match &field.value {
                FieldValue::Array(items) => {
                    let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                    line.push_str(&parts.join(","));
                }
                other => line.push_str(&other.to_string()),
            }
        }
        line
    }
}
