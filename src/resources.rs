//! Static tables shipped with the crate.

/// The built-in settings dictionary.
pub const DEFAULT_DICTIONARY: &str = include_str!("../resources/dictionary.json");

/// Every section name the language accepts.
pub const POSSIBLE_SECTIONS: [&str; 17] = [
    "column",
    "configuration",
    "dropdown",
    "group",
    "keys",
    "link",
    "node",
    "option",
    "other",
    "placeholders",
    "properties",
    "property",
    "series",
    "tag",
    "tags",
    "threshold",
    "widget",
];

/// Requirement slots per section. Each slot lists interchangeable settings;
/// declaring any one of them satisfies the slot.
pub const REQUIRED_SECTION_SETTINGS: &[(&str, &[&[&str]])] = &[
    (
        "series",
        &[
            &["entity", "value", "entities", "entitygroup", "entityexpression"],
            &["metric", "value", "table", "attribute"],
        ],
    ),
    ("widget", &[&["type"]]),
    ("dropdown", &[&["onchange", "changefield"]]),
];

/// Direct parents of nested sections.
pub const PARENT_SECTIONS: &[(&str, &[&str])] = &[
    ("widget", &["group", "configuration"]),
    ("series", &["widget", "column"]),
    ("tag", &["series"]),
    ("tags", &["series"]),
    ("column", &["widget"]),
    ("node", &["widget"]),
    ("link", &["widget"]),
];

/// Section pairs the formatter keeps on one indent level: (current, previous).
pub const SAME_LEVEL_SECTIONS: &[(&str, &str)] = &[
    ("group", "configuration"),
    ("link", "node"),
    ("series", "link"),
    ("link", "series"),
    ("node", "link"),
];
