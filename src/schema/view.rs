use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A saved presentation of a table: visible fields, filters, sorting, grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ViewFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<ViewSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<ViewGroupBy>,
}

/// Filter tree: `{ "and": [...] }`, `{ "or": [...] }` or a single condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewFilter {
    And { and: Vec<ViewFilter> },
    Or { or: Vec<ViewFilter> },
    Condition(FilterCondition),
}

/// `field <operator> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    /// Kept as text so an unknown operator is reported by the validator
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSort {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewGroupBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl ViewFilter {
    /// All leaf conditions, depth-first, each with its path below `filters`.
    pub fn conditions(&self) -> Vec<(Vec<String>, &FilterCondition)> {
        let mut out = Vec::new();
        self.collect(Vec::new(), &mut out);
        out
    }

    fn collect<'a>(
        &'a self,
        prefix: Vec<String>,
        out: &mut Vec<(Vec<String>, &'a FilterCondition)>,
    ) {
        match self {
            ViewFilter::Condition(c) => out.push((prefix, c)),
            ViewFilter::And { and: children } | ViewFilter::Or { or: children } => {
                let key = if matches!(self, ViewFilter::And { .. }) { "and" } else { "or" };
                for (i, child) in children.iter().enumerate() {
                    let mut path = prefix.clone();
                    path.push(key.to_string());
                    path.push(i.to_string());
                    child.collect(path, out);
                }
            }
        }
    }
}
