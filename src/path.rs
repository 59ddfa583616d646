use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Display;

use crate::attribute_value::AttributeValue;

/// Represents a dotted attribute path identifying a value within a document.
///
/// The path is split on every `.` and each component is matched verbatim against object keys.
/// There is no escaping and no array indexing: a component such as `"0"` only ever matches an
/// object key named `"0"`, and arrays can only be addressed as whole values.
///
/// This is represented as a separate type, rather than just a string, so that splitting can be
/// done ahead of time if a path will be used repeatedly later.
///
/// # Example
/// ```
/// # use feature_condition_evaluation::{AttributeValue, Path};
/// # use serde_json::json;
/// let document = AttributeValue::from(json!({
///   "name": "xyz",
///   "pets": {
///     "dog": {"name": "fido"}
///   },
///   "tags": ["a", "b"]
/// }));
///
/// assert_eq!(document.get_path(&Path::new("name")),
///     Some(&AttributeValue::String("xyz".to_owned())));
/// assert_eq!(document.get_path(&Path::new("pets.dog.name")),
///     Some(&AttributeValue::String("fido".to_owned())));
/// assert_eq!(document.get_path(&Path::new("pets.cat.name")), None);
/// assert_eq!(document.get_path(&Path::new("tags.0")), None);
/// ```
#[derive(Clone, Hash, PartialEq, Eq, Debug, Default)]
pub struct Path {
    components: Vec<String>,
    input: String,
}

impl Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.input)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Path::new(s))
    }
}

impl Path {
    /// Construct a new path by splitting `value` on `.`.
    ///
    /// Every string is a valid path. The empty string is a single empty component, which only
    /// matches an object key that is itself empty.
    pub fn new<S: AsRef<str>>(value: S) -> Self {
        let value = value.as_ref();
        Self {
            components: value.split('.').map(str::to_owned).collect(),
            input: value.to_owned(),
        }
    }

    /// Returns the path with no components, which resolves to the whole document.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns the number of path components.
    ///
    /// # Example
    /// ```
    /// # use feature_condition_evaluation::Path;
    /// assert_eq!(Path::new("a").depth(), 1);
    /// assert_eq!(Path::new("a.b").depth(), 2);
    /// assert_eq!(Path::root().depth(), 0);
    /// ```
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Retrieves a single path component, or None if index is out of range.
    pub fn component(&self, index: usize) -> Option<&str> {
        self.components.get(index).map(|c| c.as_str())
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.as_str())
    }
}

/// Resolves `path` against `document`.
///
/// Returns None ("absent") as soon as a component is missing or a non-object value is reached
/// before the path is exhausted. An absent result is distinct from a present
/// [AttributeValue::Null].
pub fn resolve<'a>(document: &'a AttributeValue, path: &Path) -> Option<&'a AttributeValue> {
    path.components()
        .try_fold(document, |current, component| match current {
            AttributeValue::Object(map) => map.get(component),
            _ => None,
        })
}

/// Displays the input string used to construct the [Path].
impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.input)
    }
}

impl<S> From<S> for Path
where
    S: AsRef<str>,
{
    fn from(path: S) -> Self {
        Path::new(path)
    }
}
