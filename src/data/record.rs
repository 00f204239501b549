use std::sync::OnceLock;

use regex::Regex;

/// Variable bindings of one work item, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemRecord {
    vars: Vec<(String, String)>,
}

impl WorkItemRecord {
    /// Bind `name`; rebinding keeps the variable's original position
    pub fn insert(&mut self, name: &str, value: &str) {
        match self.vars.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.vars.push((name.to_string(), value.to_string())),
        }
    }

    pub fn extend(&mut self, other: WorkItemRecord) {
        for (name, value) in other.vars {
            self.insert(&name, &value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Variable names end up in shell `export` statements
pub fn is_identifier(name: &str) -> bool {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap())
        .is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_first_occurrence() {
        let mut record = WorkItemRecord::default();
        record.insert("b", "1");
        record.insert("a", "2");
        let mut other = WorkItemRecord::default();
        other.insert("c", "3");
        other.insert("b", "4");
        record.extend(other);
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(record.get("b"), Some("4"));
    }

    #[test]
    fn identifiers() {
        for name in ["x", "alpha_1", "A9"] {
            assert!(is_identifier(name), "{name}");
        }
        for name in ["", "1x", "_x", "a-b", "a b"] {
            assert!(!is_identifier(name), "{name}");
        }
    }
}
