use serde::{Deserialize, Serialize};

/// One item read from a page during a capture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapturedItem {
    pub name: String,
    pub price: f64,
}

impl CapturedItem {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// Ordered items from one capture of a source.
///
/// Serialized as a bare JSON array of `{"name", "price"}` records so that
/// snapshot files stay readable and editable by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Snapshot {
    items: Vec<CapturedItem>,
}

impl Snapshot {
    pub fn new(items: Vec<CapturedItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CapturedItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CapturedItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<CapturedItem>> for Snapshot {
    fn from(items: Vec<CapturedItem>) -> Self {
        Self::new(items)
    }
}

impl FromIterator<CapturedItem> for Snapshot {
    fn from_iter<I: IntoIterator<Item = CapturedItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a CapturedItem;
    type IntoIter = std::slice::Iter<'a, CapturedItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
