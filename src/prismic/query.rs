//! Query predicates, orderings and options

use std::fmt;

/// Field holding the first publication timestamp of a document
pub const FIRST_PUBLICATION_DATE: &str = "document.first_publication_date";

/// Field holding the last publication timestamp of a document
pub const LAST_PUBLICATION_DATE: &str = "document.last_publication_date";

/// A query predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `[at(path, "value")]`
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Match every document of a custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At { path, value } => {
                let value = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "[at({}, \"{}\")]", path, value)
            }
        }
    }
}

/// Render a predicate list to the `q` parameter
pub fn encode_predicates(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(|p| p.to_string()).collect();
    format!("[{}]", inner)
}

/// Sort order on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "{} desc", self.field)
        } else {
            write!(f, "{}", self.field)
        }
    }
}

/// Render orderings to the `orderings` parameter
pub fn encode_orderings(orderings: &[Ordering]) -> String {
    let inner: Vec<String> = orderings.iter().map(|o| o.to_string()).collect();
    format!("[{}]", inner.join(","))
}

/// Options for a search query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Restrict `data` to these fields (`posts.title`, ...)
    pub fetch: Vec<String>,
    pub page_size: Option<usize>,
    pub page: Option<usize>,
    /// Only return documents after this document id in the ordering
    pub after: Option<String>,
    pub orderings: Vec<Ordering>,
    /// Content ref to query; the master ref when `None`
    pub reference: Option<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    pub fn reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }
}
