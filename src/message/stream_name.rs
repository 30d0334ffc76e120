//! Stream name conventions.
//!
//! A stream name is `<category>-<id>`. The category may carry type
//! qualifiers after a colon (`identity:command`).
//!
//! ```text
//! identity:command-42
//! └──────┬───────┘ └┬┘
//!     category     id
//! ```

const ID_SEPARATOR: char = '-';
const TYPE_SEPARATOR: char = ':';

/// Build an entity stream name from a category and an id.
pub fn stream_name(category: &str, id: &str) -> String {
    format!("{}{}{}", category, ID_SEPARATOR, id)
}

/// Build a command stream name (`<category>:command-<id>`).
pub fn command_stream_name(category: &str, id: &str) -> String {
    format!("{}{}command{}{}", category, TYPE_SEPARATOR, ID_SEPARATOR, id)
}

/// Build a command category name (`<category>:command`).
pub fn command_category(category: &str) -> String {
    format!("{}{}command", category, TYPE_SEPARATOR)
}

/// The category of a stream: everything before the first `-`.
///
/// A name without a `-` is itself a category.
pub fn category(stream_name: &str) -> &str {
    match stream_name.split_once(ID_SEPARATOR) {
        Some((category, _)) => category,
        None => stream_name,
    }
}

/// The id part of a stream name, if any.
pub fn id(stream_name: &str) -> Option<&str> {
    stream_name
        .split_once(ID_SEPARATOR)
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty())
}

/// True when the name has no id part, i.e. it names a whole category.
pub fn is_category(name: &str) -> bool {
    !name.contains(ID_SEPARATOR)
}

/// True when the stream belongs to `category`.
pub fn belongs_to(stream_name: &str, category_name: &str) -> bool {
    category(stream_name) == category_name
}
