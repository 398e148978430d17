/// Maps logical entity and field names onto physical identifiers.
pub trait NamingStrategy: Send + Sync {
    fn table_name(&self, entity: &str) -> String;

    fn column_name(&self, field: &str) -> String;

    /// Column holding the referenced primary key for a foreign-key field.
    fn foreign_key_column(&self, field: &str) -> String {
        format!("{}_id", self.column_name(field))
    }
}

/// `BuildRequest` becomes `build_request`, optionally prefixed.
#[derive(Clone, Debug, Default)]
pub struct SnakeCaseNaming {
    pub table_prefix: Option<String>,
}

impl SnakeCaseNaming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix<T: Into<String>>(prefix: T) -> Self {
        Self {
            table_prefix: Some(prefix.into()),
        }
    }
}

impl NamingStrategy for SnakeCaseNaming {
    fn table_name(&self, entity: &str) -> String {
        match &self.table_prefix {
            Some(prefix) => format!("{prefix}{}", to_snake_case(entity)),
            None => to_snake_case(entity),
        }
    }

    fn column_name(&self, field: &str) -> String {
        to_snake_case(field)
    }
}

pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (idx, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() {
            let prev_lower = idx > 0
                && (chars[idx - 1].is_ascii_lowercase() || chars[idx - 1].is_ascii_digit());
            let next_lower = chars.get(idx + 1).is_some_and(|c| c.is_ascii_lowercase());
            let prev_upper = idx > 0 && chars[idx - 1].is_ascii_uppercase();
            if idx > 0 && (prev_lower || (prev_upper && next_lower)) && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
