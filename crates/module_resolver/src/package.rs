use serde::Deserialize;

// Subset of package.json used during file resolution. The entry-selection
// fields are configurable at runtime ("browser", "module", "main" by
// default), so they stay in the flattened map rather than as typed fields.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl PackageJson {
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// The value of the first configured entry field that is present as a
    /// string. Non-string values (e.g. the object form of "browser") do not
    /// count as present.
    pub fn entry_field(&self, field_names: &[String]) -> Option<&str> {
        field_names
            .iter()
            .find_map(|name| self.fields.get(name).and_then(|v| v.as_str()))
    }
}
