use crate::parser::{unquote, ParsedFile};
use tree_sitter::Node;

/// Placeholder rendering for type expressions that have no canonical spelling.
pub const OPAQUE_TYPE: &str = "interface{}";

/// A field of a struct definition, either declared at package level or inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    /// Declared field name (the type name for embedded fields)
    pub name: String,
    /// Canonical type string, see [`render_type`]
    pub type_name: String,
    /// Serialization key; `-` marks a field excluded from JSON
    pub json_key: String,
    /// False when the tag carries `omitempty`
    pub required: bool,
}

impl StructField {
    /// Whether the field takes part in JSON encoding.
    pub fn is_serialized(&self) -> bool {
        self.json_key != "-"
    }
}

/// Outcome of looking up the `json` key of a struct tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKey {
    /// The tag renames the field
    Named(String),
    /// `json:"-"`, the field is never encoded
    Omitted,
    /// No `json` entry, or one with an empty name such as `json:",omitempty"`
    Unset,
}

/// Renders a syntax-level type expression to its canonical string.
///
/// Identifiers render as written, qualified names as `pkg.Name`, arrays and slices as
/// `[]T`, maps as `map[K]V` and pointers as `*T`. Every other type expression
/// (anonymous structs, function types, channels, generics, ...) renders as
/// `interface{}`.
pub fn render_type(file: &ParsedFile, node: Node) -> String {
    match node.kind() {
        "type_identifier" | "identifier" | "field_identifier" => file.text(node).to_string(),
        "qualified_type" => {
            let package = node
                .child_by_field_name("package")
                .map(|n| file.text(n))
                .unwrap_or_default();
            let name = node
                .child_by_field_name("name")
                .map(|n| file.text(n))
                .unwrap_or_default();
            format!("{}.{}", package, name)
        }
        "pointer_type" => match node.named_child(0) {
            Some(inner) => format!("*{}", render_type(file, inner)),
            None => OPAQUE_TYPE.to_string(),
        },
        "slice_type" | "array_type" | "implicit_length_array_type" => {
            match node.child_by_field_name("element") {
                Some(element) => format!("[]{}", render_type(file, element)),
                None => OPAQUE_TYPE.to_string(),
            }
        }
        "map_type" => {
            let key = node.child_by_field_name("key");
            let value = node.child_by_field_name("value");
            match (key, value) {
                (Some(key), Some(value)) => format!(
                    "map[{}]{}",
                    render_type(file, key),
                    render_type(file, value)
                ),
                _ => OPAQUE_TYPE.to_string(),
            }
        }
        "parenthesized_type" => match node.named_child(0) {
            Some(inner) => render_type(file, inner),
            None => OPAQUE_TYPE.to_string(),
        },
        _ => OPAQUE_TYPE.to_string(),
    }
}

/// Looks up `key` in a Go struct tag, following the `key:"value"` convention.
///
/// Entries are separated by spaces; values are quoted Go strings and may contain spaces.
/// Scanning stops at the first malformed entry, like `reflect.StructTag.Lookup`.
pub fn lookup_tag(tag: &str, key: &str) -> Option<String> {
    let mut rest = tag;
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return None;
        }

        let bytes = rest.as_bytes();
        let mut i = 0;
        while i < bytes.len()
            && bytes[i] > b' '
            && bytes[i] != b':'
            && bytes[i] != b'"'
            && bytes[i] != 0x7f
        {
            i += 1;
        }
        if i == 0 || i + 1 >= bytes.len() || bytes[i] != b':' || bytes[i + 1] != b'"' {
            return None;
        }
        let name = &rest[..i];
        rest = &rest[i + 1..];

        let bytes = rest.as_bytes();
        let mut j = 1;
        while j < bytes.len() && bytes[j] != b'"' {
            if bytes[j] == b'\\' {
                j += 1;
            }
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }
        let quoted = &rest[..=j];
        rest = &rest[j + 1..];

        if name == key {
            return unquote(quoted);
        }
    }
}

/// Extracts the JSON serialization key from a raw (already unquoted) struct tag.
pub fn json_tag_key(tag: &str) -> TagKey {
    let Some(value) = lookup_tag(tag, "json") else {
        return TagKey::Unset;
    };
    if value == "-" {
        return TagKey::Omitted;
    }
    match value.split(',').next() {
        Some(name) if !name.is_empty() => TagKey::Named(name.to_string()),
        _ => TagKey::Unset,
    }
}

/// Collects the fields of a `struct_type` node in declaration order.
///
/// Every name of a multi-name declaration (`A, B string`) yields its own field.
/// Embedded fields are named after their type with any pointer and package
/// qualifier removed.
pub fn struct_fields(file: &ParsedFile, struct_node: Node) -> Vec<StructField> {
    let mut fields = Vec::new();

    let mut cursor = struct_node.walk();
    let Some(list) = struct_node
        .named_children(&mut cursor)
        .find(|n| n.kind() == "field_declaration_list")
    else {
        return fields;
    };

    let mut list_cursor = list.walk();
    for decl in list.named_children(&mut list_cursor) {
        if decl.kind() != "field_declaration" {
            continue;
        }

        let Some(type_node) = decl.child_by_field_name("type") else {
            continue;
        };

        let raw_tag = decl
            .child_by_field_name("tag")
            .and_then(|t| unquote(file.text(t)))
            .unwrap_or_default();
        let tag_key = json_tag_key(&raw_tag);
        let required = !lookup_tag(&raw_tag, "json")
            .map(|v| v.split(',').skip(1).any(|opt| opt == "omitempty"))
            .unwrap_or(false);

        let mut name_cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut name_cursor)
            .map(|n| file.text(n).to_string())
            .collect();

        if names.is_empty() {
            let mut type_name = render_type(file, type_node);
            if has_pointer_marker(decl) {
                type_name = format!("*{}", type_name);
            }
            let name = embedded_field_name(file, type_node);
            fields.push(make_field(name, type_name, &tag_key, required));
        } else {
            let type_name = render_type(file, type_node);
            for name in names {
                fields.push(make_field(name, type_name.clone(), &tag_key, required));
            }
        }
    }

    fields
}

fn make_field(name: String, type_name: String, tag_key: &TagKey, required: bool) -> StructField {
    let json_key = match tag_key {
        TagKey::Named(key) => key.clone(),
        TagKey::Omitted => "-".to_string(),
        TagKey::Unset => name.to_lowercase(),
    };
    StructField {
        name,
        type_name,
        json_key,
        required,
    }
}

/// Embedded fields carry their `*` as an anonymous token of the declaration.
fn has_pointer_marker(decl: Node) -> bool {
    let mut cursor = decl.walk();
    let found = decl.children(&mut cursor).any(|c| c.kind() == "*");
    found
}

fn embedded_field_name(file: &ParsedFile, type_node: Node) -> String {
    let node = match type_node.kind() {
        "qualified_type" => type_node.child_by_field_name("name").unwrap_or(type_node),
        "generic_type" => type_node.child_by_field_name("type").unwrap_or(type_node),
        _ => type_node,
    };
    let text = file.text(node);
    text.rsplit('.').next().unwrap_or(text).to_string()
}
