use crate::dietary::{display_name, Selection};
use crate::recipe::{Ingredient, Quantity};

/// Parses the longest leading decimal number of `input`, ignoring leading whitespace.
pub fn parse_servings(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let rest = &s[end..];
    if rest.starts_with("Infinity") {
        return s[..end + "Infinity".len()].replace("Infinity", "inf").parse().ok();
    }

    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    let int_len = digits(end);
    end += int_len;
    let mut frac_len = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_len = digits(end + 1);
        if int_len > 0 || frac_len > 0 {
            end += 1 + frac_len;
        }
    }
    if int_len == 0 && frac_len == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_len = digits(exp_end);
        if exp_len > 0 {
            end = exp_end + exp_len;
        }
    }
    s[..end].parse().ok()
}

/// Desired servings, or `base` when the input is missing, unparsable or zero.
pub fn resolve_servings(input: Option<&str>, base: f64) -> f64 {
    match input.and_then(parse_servings) {
        Some(servings) if servings != 0.0 && !servings.is_nan() => servings,
        _ => base,
    }
}

pub fn scale_factor(servings: f64, base_servings: f64) -> f64 {
    servings / base_servings
}

pub fn scale_quantity(quantity: Option<&Quantity>, factor: f64) -> Option<Quantity> {
    match quantity {
        Some(Quantity::Number(n)) if *n != 0.0 => Some(Quantity::Number(n * factor)),
        other => other.cloned(),
    }
}

/// `{quantity} {unit} {name} ({notes})`, each optional part dropped when absent.
pub fn ingredient_line(ingredient: &Ingredient, factor: f64, selection: &Selection) -> String {
    let mut line = String::new();
    if let Some(quantity) = scale_quantity(ingredient.quantity.as_ref(), factor) {
        line.push_str(&format!("{} ", quantity));
    }
    if let Some(unit) = ingredient.unit.as_deref().filter(|u| !u.is_empty()) {
        line.push_str(unit);
        line.push(' ');
    }
    line.push_str(display_name(ingredient, selection));
    if let Some(notes) = ingredient.notes.as_deref().filter(|n| !n.is_empty()) {
        line.push_str(&format!(" ({})", notes));
    }
    line
}
