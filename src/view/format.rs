use crate::core::{FieldValue, MessageField};

/// Apply a printf-style format (`%d`, `%5.2f`, `%x`, `%s`, ...) to a scalar.
/// Returns None when the format has no usable conversion.
pub fn printf(format: &str, value: &FieldValue) -> Option<String> {
    let start = format.find('%')?;
    let rest = &format[start + 1..];

    let directive_len = rest
        .find(|c: char| "diufFeEgGxXsc".contains(c))
        .map(|i| i + 1)?;
    let directive = &rest[..directive_len];
    let conversion = directive.chars().last()?;
    let modifiers = directive[..directive_len - 1].trim_start_matches(['-', '+', ' ', '#', '0']);
    let modifiers = modifiers.trim_end_matches(['l', 'h']);

    let (width, precision) = match modifiers.split_once('.') {
        Some((w, p)) => (w.parse::<usize>().ok(), p.parse::<usize>().ok()),
        None => (modifiers.parse::<usize>().ok(), None),
    };
    let width = width.unwrap_or(0);

    let body = match conversion {
        'd' | 'i' | 'u' => format!("{:>width$}", value.as_f64()? as i64, width = width),
        'f' | 'F' => {
            let precision = precision.unwrap_or(6);
            format!("{:>width$.precision$}", value.as_f64()?, width = width, precision = precision)
        }
        'e' | 'E' => {
            let precision = precision.unwrap_or(6);
            format!("{:>width$.precision$e}", value.as_f64()?, width = width, precision = precision)
        }
        'g' | 'G' => format!("{:>width$}", value.as_f64()?, width = width),
        'x' => format!("{:>width$x}", value.as_f64()? as i64, width = width),
        'X' => format!("{:>width$X}", value.as_f64()? as i64, width = width),
        's' | 'c' => format!("{:>width$}", value.to_string(), width = width),
        _ => return None,
    };

    Some(format!("{}{}{}", &format[..start], body, &rest[directive_len..]))
}

/// Display text of a field value: formatted value, unit, enum label
pub fn value_text(field: &MessageField) -> String {
    let mut text = field
        .format
        .as_deref()
        .filter(|f| f.contains('%') && !field.value.is_array())
        .and_then(|f| printf(f, &field.value))
        .unwrap_or_else(|| field.value.to_string());

    if let Some(unit) = field.unit.as_deref() {
        if !unit.is_empty() && unit != "none" {
            text.push(' ');
            text.push_str(unit);
        }
    }

    if let Some(label) = field.enum_label.as_deref() {
        text.push_str(&format!(" ({})", label));
    }

    text
}

/// Value converted to the alternate unit (scalars only)
pub fn alt_value(field: &MessageField) -> Option<f64> {
    if field.is_array() {
        return None;
    }
    field.value.as_f64().map(|v| v * field.scale())
}

/// Alternate-unit text, empty when the coefficient is absent or 1
pub fn alt_value_text(field: &MessageField) -> String {
    match (alt_value(field), field.alt_unit_coef) {
        (Some(value), Some(coef)) if coef != 1.0 => {
            let mut text = format!("{:.3}", value);
            if let Some(unit) = field.alt_unit.as_deref() {
                text.push(' ');
                text.push_str(unit);
            }
            text
        }
        _ => String::new(),
    }
}
